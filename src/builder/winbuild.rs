//! Bare `winbuild` backend: the nmake makefiles shipped with the sources.
//!
//! Used on Windows with a compiler that is neither Visual Studio's CMake
//! path nor MinGW. There is no install target; the makefiles leave a
//! `builds/libcurl-<config>` tree that is copied into the package.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::builder::backend::BuildBackend;
use crate::builder::context::BuildContext;
use crate::builder::plan::BuildPlan;
use crate::util::fs::copy_dir_all;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Winbuild nmake adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct WinbuildBackend;

impl BuildBackend for WinbuildBackend {
    fn name(&self) -> &'static str {
        "winbuild"
    }

    fn configure(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner) -> Result<()> {
        // release tarballs are pre-generated; git checkouts are not
        if !ctx.source_dir.join("buildconf.bat").is_file() {
            tracing::debug!("no buildconf.bat in {}, skipping", ctx.source_dir.display());
            return Ok(());
        }
        let cmd = ProcessBuilder::new("cmd")
            .args(["/c", "buildconf.bat"])
            .cwd(&ctx.source_dir);
        runner.run(&plan.env.apply(cmd))
    }

    fn build(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner) -> Result<()> {
        let cmd = ProcessBuilder::new("nmake")
            .args(&plan.args)
            .cwd(ctx.source_dir.join("winbuild"));
        runner.run(&plan.env.apply(cmd))
    }

    fn install(&self, ctx: &BuildContext, _plan: &BuildPlan, _runner: &dyn CommandRunner) -> Result<()> {
        let output = find_output_dir(&ctx.source_dir.join("builds"))?;
        tracing::info!("installing {}", output.display());
        copy_dir_all(&output, &ctx.package_dir)
    }
}

/// The `builds/libcurl-*` directory, skipping the `-obj-` intermediates.
fn find_output_dir(builds: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(builds)
        .with_context(|| format!("failed to read {}", builds.display()))?;
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.path().is_dir() && name.starts_with("libcurl-") && !name.contains("-obj-") {
            found.push(entry.path());
        }
    }
    found.sort();
    found
        .into_iter()
        .next()
        .with_context(|| format!("no libcurl build output in {}", builds.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::OptionSet;
    use crate::core::settings::{Arch, Compiler, Os, Settings};
    use crate::core::version::LibVersion;
    use crate::test_support::{all_deps, RecordingRunner};
    use crate::util::fs::write_string;
    use tempfile::TempDir;

    #[test]
    fn test_find_output_dir_skips_objects() {
        let tmp = TempDir::new().unwrap();
        let builds = tmp.path().join("builds");
        std::fs::create_dir_all(builds.join("libcurl-vc-x64-release-static-ipv6-sspi-obj-lib"))
            .unwrap();
        std::fs::create_dir_all(builds.join("libcurl-vc-x64-release-static-ipv6-sspi")).unwrap();

        let found = find_output_dir(&builds).unwrap();
        assert!(found.ends_with("libcurl-vc-x64-release-static-ipv6-sspi"));
    }

    #[test]
    fn test_install_copies_output() {
        let tmp = TempDir::new().unwrap();
        let out = tmp
            .path()
            .join("sources/builds/libcurl-vc-x86-release-dll-ipv6-sspi");
        write_string(&out.join("lib/libcurl.lib"), "").unwrap();
        write_string(&out.join("bin/libcurl.dll"), "").unwrap();

        let settings = Settings::new(Os::Windows, Arch::X86, Compiler::Clang, "6.0");
        let version = LibVersion::parse("7.60.0").unwrap();
        let options = OptionSet::resolve(&version, &settings, &[]).unwrap();
        let ctx = BuildContext::new(tmp.path(), settings, options, version, all_deps());
        let plan = BuildPlan::new(&ctx).unwrap();

        WinbuildBackend
            .install(&ctx, &plan, &RecordingRunner::new())
            .unwrap();
        assert!(ctx.package_dir.join("lib/libcurl.lib").is_file());
        assert!(ctx.package_dir.join("bin/libcurl.dll").is_file());
    }

    #[test]
    fn test_build_runs_nmake_in_winbuild() {
        let settings = Settings::new(Os::Windows, Arch::X86_64, Compiler::Clang, "6.0");
        let version = LibVersion::parse("7.60.0").unwrap();
        let options = OptionSet::resolve(&version, &settings, &[]).unwrap();
        let ctx = BuildContext::new("/work", settings, options, version, all_deps());
        let plan = BuildPlan::new(&ctx).unwrap();
        let runner = RecordingRunner::new();

        WinbuildBackend.build(&ctx, &plan, &runner).unwrap();
        let nmake = runner.find("nmake").unwrap();
        assert!(nmake.display_command().starts_with("nmake /f Makefile.vc mode=static"));
        assert_eq!(nmake.get_cwd(), Some(Path::new("/work/sources/winbuild")));
        let cl = nmake.get_env().get("CL").unwrap();
        assert!(cl.starts_with("/DCURL_STATICLIB "));
        assert!(cl.split_whitespace().any(|s| s == "/DCURL_DISABLE_LDAP"));
        assert!(!nmake.display_command().contains("/D"));
    }
}
