//! Command implementations

pub mod completions;
pub mod create;
pub mod flags;
pub mod info;
pub mod matrix;
pub mod options;
pub mod requirements;

use anyhow::{Context, Result};

use crate::cli::{ConfigArgs, DepsArgs};
use curlpack::builder::BuildContext;
use curlpack::core::{Arch, Compiler, DepsCppInfo, LibVersion, OptionSet, Os, Recipe, Settings};
use curlpack::util::config::{global_config_path, load_config, project_config_path, Config};

/// Merged global and project configuration for the current directory.
pub fn load_project_config() -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(load_config(
        global_config_path().as_deref(),
        &project_config_path(&cwd),
    ))
}

/// Settings from the command line, defaulting to the host.
pub fn settings(args: &ConfigArgs) -> Settings {
    let os = args.os.unwrap_or_else(Os::host);
    let compiler = args.compiler.unwrap_or_else(|| Compiler::default_for(os));
    let compiler_version = match args.compiler_version {
        Some(ref v) => v.clone(),
        None if os == Os::host() => compiler.detect_version().unwrap_or_default(),
        None => String::new(),
    };
    if compiler_version.is_empty() {
        tracing::debug!("no version known for {}", compiler);
    }
    Settings::new(os, args.arch.unwrap_or_else(Arch::host), compiler, compiler_version)
        .with_build_type(args.build_type)
}

pub fn recipe(config: &Config, args: &ConfigArgs) -> Result<Recipe> {
    config.recipe(args.lib_version.as_deref())
}

/// Resolve the option set for the command-line configuration.
pub fn resolve_options(version: &LibVersion, settings: &Settings, args: &ConfigArgs) -> Result<OptionSet> {
    Ok(OptionSet::resolve(version, settings, &args.options)?)
}

/// Dependency install information: the deps file first, then `--dep`
/// prefixes on top.
pub fn load_deps(config: &Config, args: &DepsArgs) -> Result<DepsCppInfo> {
    let file = args.deps_file.as_ref().or(config.build.deps_file.as_ref());
    let mut deps = match file {
        Some(path) => DepsCppInfo::load(path)?,
        None => DepsCppInfo::new(),
    };
    deps.extend_prefixes(&args.deps);
    Ok(deps)
}

/// A build context rooted at `work_dir` for the command-line configuration.
pub fn build_context(
    config: &Config,
    args: &ConfigArgs,
    deps: &DepsArgs,
    work_dir: &std::path::Path,
) -> Result<BuildContext> {
    let recipe = recipe(config, args)?;
    let settings = settings(args);
    let options = resolve_options(&recipe.version, &settings, args)?;
    let deps = load_deps(config, deps)?;
    Ok(BuildContext::new(work_dir, settings, options, recipe.version, deps)
        .with_patches_dir(recipe.patches_dir)
        .with_jobs(config.build.jobs))
}
