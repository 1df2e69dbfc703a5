//! `curlpack create` command

use anyhow::Result;

use crate::cli::CreateArgs;
use crate::commands::{load_deps, load_project_config, recipe, settings};
use curlpack::ops::{create, CreateOptions};
use curlpack::util::process::SystemRunner;
use curlpack::util::Shell;

pub fn execute(args: CreateArgs, shell: &Shell) -> Result<()> {
    let config = load_project_config()?;
    let mut recipe = recipe(&config, &args.config)?;
    if args.patches_dir.is_some() {
        recipe.patches_dir = args.patches_dir.clone();
    }

    let mut opts = CreateOptions::new(recipe, settings(&args.config), &args.work_dir);
    opts.overrides = args.config.options.clone();
    opts.deps = load_deps(&config, &args.deps)?;
    opts.source_dir = args.source_dir;
    opts.package_dir = args.package_dir;
    opts.jobs = args.jobs.or(config.build.jobs);
    opts.strict = args.strict || config.strict_artifacts();

    let result = create(&opts, &SystemRunner, shell)?;
    tracing::info!(
        "{} files packaged with the {}",
        result.package.files.len(),
        result.plan.strategy
    );
    Ok(())
}
