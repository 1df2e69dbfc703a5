//! Upstream source retrieval.
//!
//! The release tarball is downloaded (or read from a `file://` URL),
//! optionally checked against a pinned SHA-256, and unpacked with its
//! `curl-<version>/` root stripped. The CA bundle is fetched alongside on a
//! best-effort basis.

use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use url::Url;

use crate::core::recipe::Recipe;
use crate::core::settings::Settings;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists, set_executable};
use crate::util::hash::sha256_bytes;
use crate::util::shell::{Shell, Status};

/// File name of the CA bundle placed next to the sources.
pub const CACERT_FILE: &str = "cacert.pem";

/// Fetch bytes from a URL, with a progress bar for remote downloads.
///
/// `insecure` disables TLS certificate verification.
pub fn download(url: &Url, shell: &Shell, insecure: bool) -> Result<Vec<u8>> {
    if url.scheme() == "file" {
        let path = url
            .to_file_path()
            .map_err(|_| anyhow::anyhow!("invalid file URL: {}", url))?;
        return std::fs::read(&path)
            .with_context(|| format!("failed to read {}", path.display()));
    }

    tracing::info!("downloading {}", url);
    let client = reqwest::blocking::Client::builder()
        .danger_accept_invalid_certs(insecure)
        .timeout(Duration::from_secs(300))
        .build()
        .context("failed to create HTTP client")?;

    let mut response = client
        .get(url.clone())
        .send()
        .with_context(|| format!("failed to download {}", url))?;
    if !response.status().is_success() {
        bail!("failed to download {}: HTTP {}", url, response.status());
    }

    let mut progress = shell.bytes_progress(url, response.content_length());
    let mut data = Vec::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = response
            .read(&mut buf)
            .with_context(|| format!("failed to read response body from {}", url))?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        progress.inc(n as u64);
    }
    progress.finish();
    Ok(data)
}

/// Download and unpack the source archive into `source_dir`.
///
/// Any previous contents of `source_dir` are removed first.
pub fn fetch_sources(recipe: &Recipe, source_dir: &Path, shell: &Shell) -> Result<()> {
    let url = recipe.archive_url()?;
    shell.status(Status::Fetching, format!("{} from {}", recipe.reference(), url));
    let data = download(&url, shell, false)?;

    if let Some(expected) = &recipe.sha256 {
        let actual = sha256_bytes(&data);
        if !actual.eq_ignore_ascii_case(expected) {
            bail!(
                "source archive hash mismatch for {}:\n  expected: {}\n  actual:   {}",
                url,
                expected,
                actual
            );
        }
        tracing::debug!("archive hash verified: {}", &actual[..16]);
    }

    remove_dir_all_if_exists(source_dir)?;
    extract_tarball(&data, source_dir, Some(&recipe.archive_root()))
        .with_context(|| format!("failed to extract {}", url))?;
    tracing::info!("extracted sources to {}", source_dir.display());
    Ok(())
}

/// Download the CA bundle into `dest_dir`.
///
/// Certificate verification is disabled for this download. Failures are
/// reported as a warning and otherwise ignored.
pub fn fetch_cacert(recipe: &Recipe, dest_dir: &Path, shell: &Shell) -> bool {
    let result = recipe.cacert_url().and_then(|url| {
        let data = download(&url, shell, true)?;
        ensure_dir(dest_dir)?;
        std::fs::write(dest_dir.join(CACERT_FILE), data)
            .with_context(|| format!("failed to write {}", CACERT_FILE))
    });
    match result {
        Ok(()) => true,
        Err(err) => {
            shell.warn(format!("could not fetch {}: {:#}", CACERT_FILE, err));
            false
        }
    }
}

/// Post-extraction fixups: the configure script must be executable for
/// every toolchain that runs it.
pub fn prepare_sources(source_dir: &Path, settings: &Settings) -> Result<()> {
    if settings.is_msvc() {
        return Ok(());
    }
    let configure = source_dir.join("configure");
    if configure.is_file() {
        set_executable(&configure)?;
    }
    Ok(())
}

/// Extract a gzip-compressed tarball to a destination directory.
///
/// If `strip_prefix` is provided, only that top-level directory is kept and
/// its contents become `dest`. Entries that would land outside the
/// extraction root, directly or through a symlink, are rejected.
pub fn extract_tarball(data: &[u8], dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));
    archive.set_preserve_permissions(true);

    let Some(prefix) = strip_prefix.map(|p| p.trim_matches('/')) else {
        ensure_dir(dest)?;
        return unpack_entries(&mut archive, dest);
    };

    let parent = dest
        .parent()
        .with_context(|| format!("{} has no parent directory", dest.display()))?;
    ensure_dir(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)
        .with_context(|| format!("failed to create staging directory in {}", parent.display()))?;
    unpack_entries(&mut archive, staging.path())?;

    let root = staging.path().join(prefix);
    if !root.is_dir() {
        bail!("tarball has no top-level `{}` directory", prefix);
    }
    remove_dir_all_if_exists(dest)?;
    std::fs::rename(&root, dest)
        .with_context(|| format!("failed to move sources to {}", dest.display()))?;
    Ok(())
}

fn unpack_entries<R: Read>(archive: &mut Archive<R>, dest: &Path) -> Result<()> {
    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry
            .path()
            .context("failed to get entry path")?
            .display()
            .to_string();
        let unpacked = entry
            .unpack_in(dest)
            .with_context(|| format!("failed to extract {}", entry_path))?;
        if !unpacked {
            bail!("tarball entry escapes destination directory: {}", entry_path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{Arch, Compiler, Os};
    use crate::core::version::LibVersion;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tar::Builder;
    use tempfile::TempDir;

    fn tarball(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut data, Compression::default());
            let mut builder = Builder::new(encoder);
            for (path, contents) in entries {
                let mut header = tar::Header::new_gnu();
                header.set_path(path).unwrap();
                header.set_size(contents.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append(&header, contents.as_bytes()).unwrap();
            }
            builder.into_inner().unwrap().finish().unwrap();
        }
        data
    }

    #[test]
    fn test_extract_strips_root() {
        let data = tarball(&[
            ("curl-7.52.1/COPYING", "license"),
            ("curl-7.52.1/include/curl/curl.h", "header"),
        ]);
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("sources");

        extract_tarball(&data, &dest, Some("curl-7.52.1")).unwrap();
        assert_eq!(std::fs::read_to_string(dest.join("COPYING")).unwrap(), "license");
        assert!(dest.join("include/curl/curl.h").is_file());
        assert!(!dest.join("curl-7.52.1").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_rejects_write_through_symlink() {
        let tmp = TempDir::new().unwrap();
        let outside = tmp.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();

        let mut data = Vec::new();
        {
            let mut builder = Builder::new(GzEncoder::new(&mut data, Compression::default()));
            let mut link = tar::Header::new_gnu();
            link.set_entry_type(tar::EntryType::Symlink);
            link.set_path("curl-7.52.1/lib").unwrap();
            link.set_link_name(&outside).unwrap();
            link.set_size(0);
            link.set_mode(0o777);
            link.set_cksum();
            builder.append(&link, std::io::empty()).unwrap();

            let mut file = tar::Header::new_gnu();
            file.set_path("curl-7.52.1/lib/pwned").unwrap();
            file.set_size(4);
            file.set_mode(0o644);
            file.set_cksum();
            builder.append(&file, "evil".as_bytes()).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = tmp.path().join("sources");
        assert!(extract_tarball(&data, &dest, Some("curl-7.52.1")).is_err());
        assert!(!outside.join("pwned").exists());
    }

    #[test]
    fn test_extract_rejects_parent_dir_entry() {
        let tmp = TempDir::new().unwrap();
        let mut data = Vec::new();
        {
            let mut builder = Builder::new(GzEncoder::new(&mut data, Compression::default()));
            let mut header = tar::Header::new_gnu();
            // set_path refuses `..`, so write the raw name field
            let name = b"curl-7.52.1/../../escaped";
            header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name);
            header.set_size(1);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, "x".as_bytes()).unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = tmp.path().join("work/sources");
        assert!(extract_tarball(&data, &dest, Some("curl-7.52.1")).is_err());
        assert!(!tmp.path().join("work/escaped").exists());
    }

    #[test]
    fn test_fetch_sources_from_file_url_checks_hash() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("curl-7.52.1.tar.gz");
        let data = tarball(&[("curl-7.52.1/configure", "#!/bin/sh\n")]);
        std::fs::write(&archive, &data).unwrap();

        let mut recipe = Recipe::new(LibVersion::parse("7.52.1").unwrap());
        recipe.source_url = Url::from_file_path(&archive).unwrap().to_string();
        recipe.sha256 = Some("0".repeat(64));

        let source_dir = tmp.path().join("sources");
        let err = fetch_sources(&recipe, &source_dir, &Shell::quiet()).unwrap_err();
        assert!(err.to_string().contains("hash mismatch"));

        recipe.sha256 = Some(sha256_bytes(&data));
        fetch_sources(&recipe, &source_dir, &Shell::quiet()).unwrap();
        assert!(source_dir.join("configure").is_file());
    }

    #[test]
    fn test_cacert_failure_is_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let mut recipe = Recipe::new(LibVersion::parse("7.52.1").unwrap());
        recipe.cacert_url = Url::from_file_path(tmp.path().join("missing.pem"))
            .unwrap()
            .to_string();
        assert!(!fetch_cacert(&recipe, tmp.path(), &Shell::quiet()));
        assert!(!tmp.path().join(CACERT_FILE).exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_prepare_sources_marks_configure_executable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("configure"), "#!/bin/sh\n").unwrap();
        let settings = Settings::new(Os::Linux, Arch::X86_64, Compiler::Gcc, "7");
        prepare_sources(tmp.path(), &settings).unwrap();
        let mode = std::fs::metadata(tmp.path().join("configure"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }
}
