//! Runs the selected strategy end to end.

use anyhow::{Context, Result};

use crate::builder::backend::backend_for;
use crate::builder::context::BuildContext;
use crate::builder::patch::{apply_all, common_patches};
use crate::builder::plan::BuildPlan;
use crate::util::process::CommandRunner;
use crate::util::shell::{Shell, Status};

/// Patch, configure, build and install one configuration.
///
/// Phases run strictly in order; the first failing external step aborts the
/// invocation with its error and nothing after it runs.
pub fn invoke(ctx: &BuildContext, runner: &dyn CommandRunner, shell: &Shell) -> Result<BuildPlan> {
    let plan = BuildPlan::new(ctx)?;
    let backend = backend_for(plan.strategy);
    tracing::info!("using {} for {}", plan.strategy, ctx.settings);

    let mut patches = common_patches(&ctx.options);
    patches.extend(backend.patches(ctx)?);
    if !patches.is_empty() {
        shell.status(Status::Patching, format!("{} source files", patches.len()));
        apply_all(&patches, &ctx.source_dir)?;
    }

    shell.status(Status::Configuring, format!("libcurl {} ({})", ctx.version, backend.name()));
    backend
        .configure(ctx, &plan, runner)
        .context("configure step failed")?;

    shell.status(Status::Building, format!("libcurl {} [{}]", ctx.version, ctx.settings));
    backend.build(ctx, &plan, runner).context("build step failed")?;

    shell.status(Status::Installing, ctx.package_dir.display());
    backend
        .install(ctx, &plan, runner)
        .context("install step failed")?;

    Ok(plan)
}
