//! Package upload.
//!
//! A package directory is packed as `conan_package.tgz` and PUT to the
//! upload remote under `name/version/user/channel/package/<id>/`.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use url::Url;

use crate::ops::ci::CiIdentity;
use crate::ops::package::{PackageInfo, INFO_FILE};
use crate::util::hash::sha256_bytes;
use crate::util::shell::{Shell, Status};

pub const PACKAGE_ARCHIVE: &str = "conan_package.tgz";

/// Remote login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// `CONAN_LOGIN_USERNAME` (falling back to the publishing user) and
    /// `CONAN_PASSWORD`.
    pub fn from_env(default_username: &str) -> Result<Self> {
        Self::resolve(default_username, |key| std::env::var(key).ok())
    }

    pub fn resolve(
        default_username: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let password = env("CONAN_PASSWORD")
            .filter(|p| !p.is_empty())
            .context("CONAN_PASSWORD is not set; cannot authenticate to the upload remote")?;
        let username = env("CONAN_LOGIN_USERNAME")
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| default_username.to_string());
        Ok(Credentials { username, password })
    }
}

/// Stable identifier of a binary package: a hash over its settings and
/// options.
pub fn package_id(info: &PackageInfo) -> String {
    let s = &info.settings;
    let mut text = format!(
        "os={}\narch={}\ncompiler={}\ncompiler.version={}\nbuild_type={}\n",
        s.os, s.arch, s.compiler, s.compiler_version, s.build_type
    );
    for (key, value) in &info.options {
        text.push_str(&format!("{}={}\n", key, value));
    }
    sha256_bytes(text.as_bytes())[..40].to_string()
}

/// Upload location of a package.
pub fn upload_url(remote: &str, info: &PackageInfo, identity: &CiIdentity) -> Result<Url> {
    let (name, version) = info
        .reference
        .split_once('/')
        .with_context(|| format!("malformed package reference `{}`", info.reference))?;
    let raw = format!(
        "{}/{}/{}/{}/{}/package/{}/{}",
        remote.trim_end_matches('/'),
        name,
        version,
        identity.username,
        identity.channel,
        package_id(info),
        PACKAGE_ARCHIVE
    );
    Url::parse(&raw).with_context(|| format!("invalid upload URL `{}`", raw))
}

/// Pack a directory into a gzip-compressed tarball.
pub fn pack_directory(dir: &Path) -> Result<Vec<u8>> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(".", dir)
        .with_context(|| format!("failed to pack {}", dir.display()))?;
    let encoder = builder.into_inner().context("failed to finish package archive")?;
    encoder.finish().context("failed to compress package archive")
}

/// Pack and upload one built package.
pub fn upload_package(
    package_dir: &Path,
    remote: &str,
    identity: &CiIdentity,
    credentials: &Credentials,
    shell: &Shell,
) -> Result<Url> {
    let info = PackageInfo::load(&package_dir.join(INFO_FILE))?;
    let url = upload_url(remote, &info, identity)?;
    let data = pack_directory(package_dir)?;

    shell.status(
        Status::Uploading,
        format!("{} ({} bytes) to {}", identity.reference(info.reference_name()), data.len(), remote),
    );
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(600))
        .build()
        .context("failed to create HTTP client")?;
    let response = client
        .put(url.clone())
        .basic_auth(&credentials.username, Some(&credentials.password))
        .header(reqwest::header::CONTENT_TYPE, "application/gzip")
        .body(data)
        .send()
        .with_context(|| format!("failed to upload to {}", url))?;
    if !response.status().is_success() {
        bail!("upload to {} failed: HTTP {}", url, response.status());
    }

    shell.status(Status::Uploaded, &url);
    Ok(url)
}
