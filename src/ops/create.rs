//! Implementation of `curlpack create`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::builder::{invoke, BuildContext, BuildPlan, BuildStrategy};
use crate::core::cpp_info::CppInfo;
use crate::core::dependency::declare_requirements;
use crate::core::deps_info::DepsCppInfo;
use crate::core::options::{OptionOverride, OptionSet};
use crate::core::recipe::Recipe;
use crate::core::settings::Settings;
use crate::ops::package::{package, PackageInfo, PackageOptions};
use crate::sources::{fetch_cacert, fetch_sources, prepare_sources};
use crate::util::fs::{copy_dir_all, remove_dir_all_if_exists};
use crate::util::process::{find_executable, CommandRunner};
use crate::util::shell::{Shell, Status};

/// Options for the create command.
#[derive(Debug, Clone)]
pub struct CreateOptions {
    pub recipe: Recipe,
    pub settings: Settings,
    pub overrides: Vec<OptionOverride>,

    /// Install information of the dependencies
    pub deps: DepsCppInfo,

    /// Root for `sources/`, `build/` and `package/`
    pub work_dir: PathBuf,

    /// Copy an already unpacked source tree instead of downloading
    pub source_dir: Option<PathBuf>,

    pub package_dir: Option<PathBuf>,

    /// Number of parallel jobs
    pub jobs: Option<usize>,

    /// Fail when a required artifact pattern matches nothing
    pub strict: bool,

    /// Check that the strategy's tools are on PATH before fetching
    pub check_tools: bool,
}

impl CreateOptions {
    pub fn new(recipe: Recipe, settings: Settings, work_dir: impl Into<PathBuf>) -> Self {
        CreateOptions {
            recipe,
            settings,
            overrides: Vec::new(),
            deps: DepsCppInfo::new(),
            work_dir: work_dir.into(),
            source_dir: None,
            package_dir: None,
            jobs: None,
            strict: false,
            check_tools: true,
        }
    }
}

/// Result of a successful create.
#[derive(Debug)]
pub struct CreateResult {
    pub plan: BuildPlan,
    pub package: PackageInfo,
    pub package_dir: PathBuf,
}

/// Resolve, fetch, build and package one configuration.
///
/// Every configuration error surfaces before the first download or
/// external tool runs.
pub fn create(opts: &CreateOptions, runner: &dyn CommandRunner, shell: &Shell) -> Result<CreateResult> {
    let recipe = &opts.recipe;
    let options = OptionSet::resolve(&recipe.version, &opts.settings, &opts.overrides)?;
    tracing::debug!("resolved options: {}", options);

    let requirements = declare_requirements(&options, &opts.settings);
    opts.deps.check(&requirements)?;

    let strategy = BuildStrategy::select(&opts.settings)?;
    if opts.check_tools {
        check_tools(strategy)?;
    }

    let mut ctx = BuildContext::new(
        &opts.work_dir,
        opts.settings.clone(),
        options,
        recipe.version.clone(),
        opts.deps.clone(),
    )
    .with_patches_dir(recipe.patches_dir.clone())
    .with_jobs(opts.jobs);
    if let Some(ref dir) = opts.package_dir {
        ctx = ctx.with_package_dir(dir);
    }
    // options the build system cannot express fail here, not after the fetch
    BuildPlan::new(&ctx)?;

    match opts.source_dir {
        Some(ref dir) => {
            if !dir.is_dir() {
                bail!("source directory {} does not exist", dir.display());
            }
            if same_dir(dir, &ctx.source_dir) {
                bail!(
                    "source directory {} is the work directory's copy\n\
                     help: pass the original checkout or a different --work-dir",
                    dir.display()
                );
            }
            // patches edit the copy; the caller's tree stays pristine
            remove_dir_all_if_exists(&ctx.source_dir)?;
            copy_dir_all(dir, &ctx.source_dir).with_context(|| {
                format!("failed to copy sources from {}", dir.display())
            })?;
            tracing::info!("copied sources from {}", dir.display());
        }
        None => fetch_sources(recipe, &ctx.source_dir, shell)?,
    }
    fetch_cacert(recipe, &opts.work_dir, shell);
    prepare_sources(&ctx.source_dir, &ctx.settings)?;

    let plan = invoke(&ctx, runner, shell)?;

    let cpp_info = CppInfo::declare(&ctx.options, &ctx.settings, &ctx.version, &ctx.deps)
        .context("failed to declare link metadata")?;
    let package_opts = PackageOptions {
        cacert_dir: opts.work_dir.clone(),
        strict: opts.strict,
    };
    let info = package(&ctx, recipe, &cpp_info, &package_opts, shell)?;

    shell.status(
        Status::Packaged,
        format!("{} [{}] in {}", info.reference, ctx.settings, ctx.package_dir.display()),
    );

    Ok(CreateResult {
        plan,
        package: info,
        package_dir: ctx.package_dir,
    })
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Fail early when a tool the strategy drives is missing.
pub fn check_tools(strategy: BuildStrategy) -> Result<()> {
    for tool in strategy.required_tools() {
        if find_executable(tool).is_none() {
            bail!(
                "`{}` not found in PATH\n\
                 help: the {} needs it installed",
                tool,
                strategy
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::deps_info::DepCppInfo;
    use crate::core::errors::ConfigError;
    use crate::core::options::OptionKey;
    use crate::core::settings::{Arch, Compiler, Os};
    use crate::core::version::LibVersion;
    use crate::ops::package::INFO_FILE;
    use crate::test_support::{all_deps, CommandPattern, RecordingRunner, SourceFixture};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;
    use url::Url;

    fn linux() -> Settings {
        Settings::new(Os::Linux, Arch::X86_64, Compiler::Gcc, "7")
    }

    /// A recipe whose sources come from a local tarball of the fixture tree.
    fn local_recipe(tmp: &TempDir) -> Recipe {
        let tree = tmp.path().join("fixture");
        SourceFixture::curl().write(&tree);

        let archive = tmp.path().join("curl-7.52.1.tar.gz");
        let file = std::fs::File::create(&archive).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder.append_dir_all("curl-7.52.1", &tree).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let mut recipe = Recipe::new(LibVersion::parse("7.52.1").unwrap());
        recipe.source_url = Url::from_file_path(&archive).unwrap().to_string();
        recipe.cacert_url = Url::from_file_path(tmp.path().join("no-cacert.pem"))
            .unwrap()
            .to_string();
        recipe
    }

    fn options(tmp: &TempDir, settings: Settings) -> CreateOptions {
        let mut opts = CreateOptions::new(local_recipe(tmp), settings, tmp.path().join("work"));
        opts.deps = all_deps();
        opts.check_tools = false;
        opts
    }

    #[test]
    fn test_create_runs_every_phase() {
        let tmp = TempDir::new().unwrap();
        let opts = options(&tmp, linux());
        let runner = RecordingRunner::new();

        let result = create(&opts, &runner, &Shell::quiet()).unwrap();
        assert_eq!(result.plan.strategy, BuildStrategy::Autotools);
        assert_eq!(runner.calls().last().map(String::as_str), Some("make install"));

        let work = tmp.path().join("work");
        assert!(work.join("sources/configure").is_file());
        assert!(result.package_dir.join("licenses/COPYING").is_file());
        assert!(result.package_dir.join(INFO_FILE).is_file());
        assert!(result.package.cpp_info.declares_static());
        assert!(result
            .package
            .requires
            .iter()
            .any(|r| r.starts_with("OpenSSL/")));
    }

    #[test]
    fn test_configuration_errors_precede_fetch() {
        let tmp = TempDir::new().unwrap();
        let mut opts = options(&tmp, linux());
        opts.overrides = vec![OptionOverride::new(OptionKey::DarwinSsl, true)];
        let runner = RecordingRunner::new();

        let err = create(&opts, &runner, &Shell::quiet()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::OptionNotAvailable { .. })
        ));
        assert!(!tmp.path().join("work/sources").exists());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_missing_dependency_is_reported() {
        let tmp = TempDir::new().unwrap();
        let mut opts = options(&tmp, linux());
        opts.deps = DepsCppInfo::new();
        opts.deps.insert("zlib", DepCppInfo::from_prefix("zlib", "/deps/zlib"));

        let err = create(&opts, &RecordingRunner::new(), &Shell::quiet()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::DependencyNotInstalled { name }) if name == "OpenSSL"
        ));
    }

    #[test]
    fn test_build_failure_skips_packaging() {
        let tmp = TempDir::new().unwrap();
        let opts = options(&tmp, linux());
        let runner = RecordingRunner::new().fail_on(CommandPattern::Contains("configure".into()));

        assert!(create(&opts, &runner, &Shell::quiet()).is_err());
        assert!(!tmp.path().join("work/package").join(INFO_FILE).exists());
    }

    #[test]
    fn test_existing_source_dir() {
        let tmp = TempDir::new().unwrap();
        let mut opts = options(&tmp, linux());
        let sources = tmp.path().join("checkout");
        SourceFixture::curl().write(&sources);
        opts.source_dir = Some(sources.clone());
        opts.recipe.source_url = "https://invalid.example/{version}.tar.gz".to_string();

        create(&opts, &RecordingRunner::new(), &Shell::quiet()).unwrap();
        assert!(tmp.path().join("work/sources/configure").is_file());
    }

    #[test]
    fn test_source_dir_is_not_patched_in_place() {
        let tmp = TempDir::new().unwrap();
        let mut opts = options(&tmp, linux());
        let sources = tmp.path().join("checkout");
        SourceFixture::curl().write(&sources);
        opts.source_dir = Some(sources.clone());
        opts.overrides = vec![OptionOverride::new(OptionKey::WithLargemaxwritesize, true)];

        // the strict CURL_MAX_WRITE_SIZE patch fails on an already patched tree
        create(&opts, &RecordingRunner::new(), &Shell::quiet()).unwrap();
        create(&opts, &RecordingRunner::new(), &Shell::quiet()).unwrap();

        let header = "include/curl/curl.h";
        assert_eq!(
            std::fs::read_to_string(sources.join(header)).unwrap(),
            "#define CURL_MAX_WRITE_SIZE 16384\n"
        );
        assert!(std::fs::read_to_string(tmp.path().join("work/sources").join(header))
            .unwrap()
            .contains("10485760"));
    }

    #[test]
    fn test_source_dir_inside_work_dir_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut opts = options(&tmp, linux());
        let sources = tmp.path().join("work/sources");
        SourceFixture::curl().write(&sources);
        opts.source_dir = Some(sources.clone());

        assert!(create(&opts, &RecordingRunner::new(), &Shell::quiet()).is_err());
        assert!(sources.join("configure").is_file());
    }
}
