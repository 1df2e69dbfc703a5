//! CMake backend for the Visual Studio toolchain.

use anyhow::Result;

use crate::builder::backend::BuildBackend;
use crate::builder::context::BuildContext;
use crate::builder::patch::{cmake_patches, SourcePatch};
use crate::builder::plan::BuildPlan;
use crate::util::fs::ensure_dir;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// CMake build adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CMakeBackend;

impl CMakeBackend {
    fn cmake(&self, plan: &BuildPlan) -> ProcessBuilder {
        plan.env.apply(ProcessBuilder::new("cmake"))
    }
}

impl BuildBackend for CMakeBackend {
    fn name(&self) -> &'static str {
        "cmake"
    }

    fn patches(&self, _ctx: &BuildContext) -> Result<Vec<SourcePatch>> {
        Ok(cmake_patches())
    }

    /// Run CMake configuration.
    fn configure(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner) -> Result<()> {
        ensure_dir(&ctx.build_dir)?;
        let cmd = self
            .cmake(plan)
            .arg("-S")
            .arg(&ctx.source_dir)
            .arg("-B")
            .arg(&ctx.build_dir)
            .args(&plan.args);
        runner.run(&cmd)
    }

    /// Run CMake build.
    fn build(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner) -> Result<()> {
        let cmd = self
            .cmake(plan)
            .arg("--build")
            .arg(&ctx.build_dir)
            // multi-config generators pick the configuration at build time
            .arg("--config")
            .arg(ctx.settings.build_type.as_str())
            .arg("--parallel")
            .arg(ctx.jobs().to_string());
        runner.run(&cmd)
    }

    fn install(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner) -> Result<()> {
        let cmd = self
            .cmake(plan)
            .arg("--build")
            .arg(&ctx.build_dir)
            .arg("--config")
            .arg(ctx.settings.build_type.as_str())
            .arg("--target")
            .arg("install");
        runner.run(&cmd)
    }
}
