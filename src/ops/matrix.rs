//! Build matrix generation and execution.
//!
//! The matrix is the cross product of compiler versions, architectures,
//! build types and linkage for the host OS, plus one extra variant with
//! `darwin_ssl=false` for every apple-clang Release build. Each entry runs as
//! an isolated `curlpack create` child process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::core::options::{OptionKey, OptionOverride};
use crate::core::recipe::RECIPE_NAME;
use crate::core::settings::{Arch, BuildType, Compiler, Os, Settings};
use crate::ops::ci::CiIdentity;
use crate::ops::upload::{upload_package, Credentials};
use crate::util::config::MatrixConfig;
use crate::util::process::{CommandRunner, ProcessBuilder};
use crate::util::shell::{Shell, Status};

const DEFAULT_GCC_VERSIONS: &[&str] = &["4.9", "5", "6", "7"];
const DEFAULT_APPLE_CLANG_VERSIONS: &[&str] = &["8.1", "9.0", "9.1"];
const DEFAULT_VISUAL_VERSIONS: &[&str] = &["12", "14", "15"];

/// Option prefix used by matrix entries (`libcurl:shared`).
pub fn option_name(key: OptionKey) -> String {
    format!("{}:{}", RECIPE_NAME, key)
}

/// Axes of the matrix for one host OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixAxes {
    pub os: Os,
    pub archs: Vec<Arch>,
    pub build_types: Vec<BuildType>,
    pub gcc_versions: Vec<String>,
    pub clang_versions: Vec<String>,
    pub apple_clang_versions: Vec<String>,
    pub visual_versions: Vec<String>,
}

impl MatrixAxes {
    /// Resolve the axes from the process environment and config.
    pub fn from_env(os: Os, config: &MatrixConfig) -> Result<Self> {
        Self::resolve(os, config, |key| std::env::var(key).ok())
    }

    /// `CONAN_*` variables win over the config file, which wins over the
    /// defaults.
    pub fn resolve(
        os: Os,
        config: &MatrixConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let axis = |var: &str, configured: &[String]| -> Vec<String> {
            match env(var).map(|v| split_list(&v)).filter(|v| !v.is_empty()) {
                Some(values) => values,
                None => configured.to_vec(),
            }
        };

        let archs = axis("CONAN_ARCHS", &config.archs);
        let archs = if archs.is_empty() {
            match os {
                Os::Macos => vec![Arch::X86_64],
                _ => vec![Arch::X86, Arch::X86_64],
            }
        } else {
            archs
                .iter()
                .map(|a| a.parse::<Arch>())
                .collect::<Result<_, _>>()?
        };

        let build_types = axis("CONAN_BUILD_TYPES", &config.build_types);
        let build_types = if build_types.is_empty() {
            vec![BuildType::Release, BuildType::Debug]
        } else {
            build_types
                .iter()
                .map(|b| b.parse::<BuildType>())
                .collect::<Result<_, _>>()?
        };

        let mut gcc_versions = axis("CONAN_GCC_VERSIONS", &config.gcc_versions);
        let clang_versions = axis("CONAN_CLANG_VERSIONS", &config.clang_versions);
        if gcc_versions.is_empty() && clang_versions.is_empty() {
            gcc_versions = owned(DEFAULT_GCC_VERSIONS);
        }
        let mut apple_clang_versions =
            axis("CONAN_APPLE_CLANG_VERSIONS", &config.apple_clang_versions);
        if apple_clang_versions.is_empty() {
            apple_clang_versions = owned(DEFAULT_APPLE_CLANG_VERSIONS);
        }
        let mut visual_versions = axis("CONAN_VISUAL_VERSIONS", &config.visual_versions);
        if visual_versions.is_empty() {
            visual_versions = owned(DEFAULT_VISUAL_VERSIONS);
        }

        Ok(MatrixAxes {
            os,
            archs,
            build_types,
            gcc_versions,
            clang_versions,
            apple_clang_versions,
            visual_versions,
        })
    }

    /// Compilers built on this OS with their versions.
    fn compilers(&self) -> Vec<(Compiler, &[String])> {
        match self.os {
            Os::Macos => vec![(Compiler::AppleClang, self.apple_clang_versions.as_slice())],
            Os::Windows => vec![(Compiler::VisualStudio, self.visual_versions.as_slice())],
            Os::Linux | Os::FreeBSD => vec![
                (Compiler::Gcc, self.gcc_versions.as_slice()),
                (Compiler::Clang, self.clang_versions.as_slice()),
            ],
        }
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Split a `CONAN_*` list on commas.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One configuration of the matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixEntry {
    pub settings: Settings,
    /// `libcurl:<key>` overrides
    pub options: BTreeMap<String, bool>,
}

impl MatrixEntry {
    fn new(settings: Settings, shared: bool) -> Self {
        let mut options = BTreeMap::new();
        options.insert(option_name(OptionKey::Shared), shared);
        MatrixEntry { settings, options }
    }

    /// Short directory-safe name, e.g. `linux-gcc7-x86_64-release-shared`.
    pub fn id(&self) -> String {
        let s = &self.settings;
        let shared = self.options.get(&option_name(OptionKey::Shared)).copied().unwrap_or(false);
        let mut id = format!(
            "{}-{}{}-{}-{}-{}",
            s.os,
            s.compiler.as_str().replace(' ', ""),
            s.compiler_version,
            s.arch,
            s.build_type,
            if shared { "shared" } else { "static" }
        );
        if self.options.get(&option_name(OptionKey::DarwinSsl)) == Some(&false) {
            id.push_str("-openssl");
        }
        id.to_lowercase()
    }

    /// Option overrides with the recipe prefix stripped.
    pub fn overrides(&self) -> Result<Vec<OptionOverride>> {
        self.options
            .iter()
            .map(|(name, value)| -> Result<OptionOverride> {
                let key = name
                    .strip_prefix(&format!("{}:", RECIPE_NAME))
                    .unwrap_or(name)
                    .parse::<OptionKey>()?;
                Ok(OptionOverride::new(key, *value))
            })
            .collect()
    }

    /// Arguments for the `curlpack create` child process.
    pub fn create_args(&self, work_dir: &Path) -> Result<Vec<String>> {
        let s = &self.settings;
        let mut args = vec![
            "create".to_string(),
            "--os".to_string(),
            s.os.to_string(),
            "--arch".to_string(),
            s.arch.to_string(),
            "--compiler".to_string(),
            s.compiler.to_string(),
            "--compiler-version".to_string(),
            s.compiler_version.clone(),
            "--build-type".to_string(),
            s.build_type.to_string(),
            "--work-dir".to_string(),
            work_dir.join(self.id()).display().to_string(),
        ];
        for ov in self.overrides()? {
            args.push("-o".to_string());
            args.push(format!("{}={}", ov.key, ov.value));
        }
        Ok(args)
    }
}

#[derive(Serialize)]
struct PlanEntry<'a> {
    id: String,
    os: &'a str,
    arch: &'a str,
    compiler: &'a str,
    compiler_version: &'a str,
    build_type: &'a str,
    options: &'a BTreeMap<String, bool>,
}

/// Render the matrix as pretty JSON.
pub fn plan_json(entries: &[MatrixEntry]) -> Result<String> {
    let plan: Vec<_> = entries
        .iter()
        .map(|e| PlanEntry {
            id: e.id(),
            os: e.settings.os.as_str(),
            arch: e.settings.arch.as_str(),
            compiler: e.settings.compiler.as_str(),
            compiler_version: &e.settings.compiler_version,
            build_type: e.settings.build_type.as_str(),
            options: &e.options,
        })
        .collect();
    serde_json::to_string_pretty(&plan).context("failed to serialize build matrix")
}

/// Common builds for the host OS, with the extra OpenSSL variants.
pub fn generate(axes: &MatrixAxes) -> Vec<MatrixEntry> {
    let mut entries = Vec::new();
    for (compiler, versions) in axes.compilers() {
        for version in versions {
            for arch in &axes.archs {
                for build_type in &axes.build_types {
                    for shared in [false, true] {
                        let settings = Settings::new(axes.os, *arch, compiler, version.clone())
                            .with_build_type(*build_type);
                        entries.push(MatrixEntry::new(settings, shared));
                    }
                }
            }
        }
    }
    with_openssl_variants(entries)
}

/// After every apple-clang Release entry, insert a copy building against
/// OpenSSL instead of Secure Transport.
pub fn with_openssl_variants(entries: Vec<MatrixEntry>) -> Vec<MatrixEntry> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        let extra = (entry.settings.compiler == Compiler::AppleClang
            && entry.settings.build_type == BuildType::Release)
            .then(|| {
                let mut variant = entry.clone();
                variant.options.insert(option_name(OptionKey::DarwinSsl), false);
                variant
            });
        out.push(entry);
        out.extend(extra);
    }
    out
}

/// Where finished packages are uploaded.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub remote: String,
    pub identity: CiIdentity,
    pub credentials: Credentials,
}

/// Options for running a matrix.
#[derive(Debug, Clone)]
pub struct MatrixOptions {
    /// The `curlpack` executable to spawn
    pub exe: PathBuf,
    /// Parent of the per-entry work directories
    pub work_dir: PathBuf,
    /// Concurrent child builds
    pub jobs: usize,
    /// Appended to every child command line
    pub extra_args: Vec<String>,
    pub upload: Option<UploadTarget>,
}

/// Outcome of a matrix run.
#[derive(Debug, Default)]
pub struct MatrixReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Run every entry as a child process.
///
/// All entries run even when some fail; the run fails afterwards if any did.
pub fn run(
    entries: &[MatrixEntry],
    opts: &MatrixOptions,
    runner: &(dyn CommandRunner + Sync),
    shell: &Shell,
) -> Result<MatrixReport> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("failed to create build pool")?;

    shell.status(
        Status::Building,
        format!("{} configurations ({} at a time)", entries.len(), opts.jobs.max(1)),
    );

    let results: Vec<(String, Result<()>)> = pool.install(|| {
        entries
            .par_iter()
            .map(|entry| (entry.id(), run_entry(entry, opts, runner, shell)))
            .collect()
    });

    let mut report = MatrixReport::default();
    for (id, result) in results {
        match result {
            Ok(()) => report.succeeded.push(id),
            Err(err) => {
                shell.error(format!("{}: {:#}", id, err));
                report.failed.push((id, format!("{:#}", err)));
            }
        }
    }

    if !report.failed.is_empty() {
        bail!(
            "{} of {} configurations failed: {}",
            report.failed.len(),
            entries.len(),
            report
                .failed
                .iter()
                .map(|(id, _)| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    shell.status(Status::Finished, format!("{} configurations", report.succeeded.len()));
    Ok(report)
}

fn run_entry(
    entry: &MatrixEntry,
    opts: &MatrixOptions,
    runner: &(dyn CommandRunner + Sync),
    shell: &Shell,
) -> Result<()> {
    let cmd = ProcessBuilder::new(&opts.exe)
        .args(entry.create_args(&opts.work_dir)?)
        .args(&opts.extra_args);
    runner.run(&cmd)?;

    if let Some(ref target) = opts.upload {
        let package_dir = opts.work_dir.join(entry.id()).join("package");
        upload_package(
            &package_dir,
            &target.remote,
            &target.identity,
            &target.credentials,
            shell,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CommandPattern, RecordingRunner};
    use std::collections::HashMap;

    fn axes(os: Os, vars: &[(&str, &str)], config: &MatrixConfig) -> MatrixAxes {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MatrixAxes::resolve(os, config, |k| env.get(k).cloned()).unwrap()
    }

    #[test]
    fn test_linux_common_builds() {
        let axes = axes(
            Os::Linux,
            &[("CONAN_GCC_VERSIONS", "6,7"), ("CONAN_ARCHS", "x86_64")],
            &MatrixConfig::default(),
        );
        let entries = generate(&axes);
        // 2 versions x 1 arch x 2 build types x 2 linkages
        assert_eq!(entries.len(), 8);
        assert!(entries.iter().all(|e| e.settings.compiler == Compiler::Gcc));
        assert_eq!(entries[0].id(), "linux-gcc6-x86_64-release-static");
        assert_eq!(entries[1].id(), "linux-gcc6-x86_64-release-shared");
    }

    #[test]
    fn test_gcc_defaults_only_without_clang() {
        let axes = axes(Os::Linux, &[("CONAN_CLANG_VERSIONS", "5.0")], &MatrixConfig::default());
        assert!(axes.gcc_versions.is_empty());
        assert_eq!(axes.clang_versions, vec!["5.0"]);

        let axes = default_linux_axes();
        assert_eq!(axes.gcc_versions, owned(DEFAULT_GCC_VERSIONS));
    }

    fn default_linux_axes() -> MatrixAxes {
        axes(Os::Linux, &[], &MatrixConfig::default())
    }

    #[test]
    fn test_env_overrides_config() {
        let config = MatrixConfig {
            build_types: vec!["Debug".to_string()],
            visual_versions: vec!["14".to_string()],
            ..Default::default()
        };
        let axes = axes(Os::Windows, &[("CONAN_VISUAL_VERSIONS", "15")], &config);
        assert_eq!(axes.build_types, vec![BuildType::Debug]);
        assert_eq!(axes.visual_versions, vec!["15"]);
        assert_eq!(axes.archs, vec![Arch::X86, Arch::X86_64]);
    }

    #[test]
    fn test_invalid_arch_is_an_error() {
        let env = |k: &str| (k == "CONAN_ARCHS").then(|| "sparc".to_string());
        assert!(MatrixAxes::resolve(Os::Linux, &MatrixConfig::default(), env).is_err());
    }

    #[test]
    fn test_apple_clang_release_gets_openssl_variant() {
        let axes = axes(
            Os::Macos,
            &[("CONAN_APPLE_CLANG_VERSIONS", "9.1")],
            &MatrixConfig::default(),
        );
        let entries = generate(&axes);
        // 4 common builds + 2 Release variants
        assert_eq!(entries.len(), 6);

        let variants: Vec<_> = entries
            .iter()
            .filter(|e| e.options.get("libcurl:darwin_ssl") == Some(&false))
            .collect();
        assert_eq!(variants.len(), 2);
        assert!(variants
            .iter()
            .all(|e| e.settings.build_type == BuildType::Release));
        assert!(entries[1].id().ends_with("-openssl"));
        assert_eq!(entries[1].settings, entries[0].settings);
    }

    #[test]
    fn test_create_args() {
        let entry = with_openssl_variants(vec![MatrixEntry::new(
            Settings::new(Os::Macos, Arch::X86_64, Compiler::AppleClang, "9.1"),
            true,
        )])
        .pop()
        .unwrap();
        let args = entry.create_args(Path::new("/matrix")).unwrap();
        assert_eq!(&args[..3], &["create", "--os", "Macos"]);
        assert!(args.contains(&"/matrix/macos-apple-clang9.1-x86_64-release-shared-openssl".to_string()));
        assert!(args.contains(&"darwin_ssl=false".to_string()));
        assert!(args.contains(&"shared=true".to_string()));
    }

    #[test]
    fn test_plan_json() {
        let axes = axes(
            Os::Windows,
            &[("CONAN_VISUAL_VERSIONS", "15"), ("CONAN_ARCHS", "x86_64"), ("CONAN_BUILD_TYPES", "Release")],
            &MatrixConfig::default(),
        );
        let json = plan_json(&generate(&axes)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["compiler"], "Visual Studio");
        assert_eq!(entries[1]["options"]["libcurl:shared"], true);
    }

    #[test]
    fn test_run_reports_failures() {
        let axes = axes(
            Os::Linux,
            &[("CONAN_GCC_VERSIONS", "7"), ("CONAN_ARCHS", "x86_64"), ("CONAN_BUILD_TYPES", "Release")],
            &MatrixConfig::default(),
        );
        let entries = generate(&axes);
        let opts = MatrixOptions {
            exe: PathBuf::from("curlpack"),
            work_dir: PathBuf::from("/matrix"),
            jobs: 2,
            extra_args: vec!["--strict".to_string()],
            upload: None,
        };

        let runner = RecordingRunner::new();
        let report = run(&entries, &opts, &runner, &Shell::quiet()).unwrap();
        assert_eq!(report.succeeded.len(), 2);
        assert!(runner
            .calls()
            .iter()
            .all(|c| c.starts_with("curlpack create --os Linux") && c.ends_with("--strict")));

        let runner = RecordingRunner::new().fail_on(CommandPattern::Contains("shared=true".into()));
        let err = run(&entries, &opts, &runner, &Shell::quiet()).unwrap_err();
        assert!(err.to_string().contains("linux-gcc7-x86_64-release-shared"));
        assert_eq!(runner.calls().len(), 2);
    }
}
