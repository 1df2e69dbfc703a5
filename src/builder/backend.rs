//! BuildBackend trait - interface for the upstream build systems.

use anyhow::Result;

use crate::builder::autotools::AutotoolsBackend;
use crate::builder::cmake::CMakeBackend;
use crate::builder::context::BuildContext;
use crate::builder::patch::SourcePatch;
use crate::builder::plan::BuildPlan;
use crate::builder::strategy::BuildStrategy;
use crate::builder::winbuild::WinbuildBackend;
use crate::util::process::CommandRunner;

/// A way of driving the upstream build system.
///
/// The trait is purely operational: flags and environment come from the
/// [`BuildPlan`], every external step goes through the runner, and a failed
/// step returns an error that aborts the remaining phases.
pub trait BuildBackend {
    /// Short name used in status output.
    fn name(&self) -> &'static str;

    /// Source patches specific to this backend.
    fn patches(&self, _ctx: &BuildContext) -> Result<Vec<SourcePatch>> {
        Ok(Vec::new())
    }

    /// Configure the build.
    fn configure(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner)
        -> Result<()>;

    /// Compile.
    fn build(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner)
        -> Result<()>;

    /// Install into the package directory.
    fn install(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner)
        -> Result<()>;
}

/// The backend implementing a strategy.
pub fn backend_for(strategy: BuildStrategy) -> Box<dyn BuildBackend> {
    match strategy {
        BuildStrategy::CMakeProject => Box::new(CMakeBackend),
        BuildStrategy::Autotools => Box::new(AutotoolsBackend::native()),
        BuildStrategy::CrossAutotools { triple } => Box::new(AutotoolsBackend::cross(triple)),
        BuildStrategy::Manual => Box::new(WinbuildBackend),
    }
}
