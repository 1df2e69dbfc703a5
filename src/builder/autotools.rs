//! Autotools backend: `buildconf`, `configure`, `make`, `make install`.
//!
//! On a POSIX host the tools run directly. For MinGW every step is wrapped
//! in `bash -lc` so it runs inside the MSYS shell.

use std::path::Path;

use anyhow::Result;

use crate::builder::backend::BuildBackend;
use crate::builder::context::BuildContext;
use crate::builder::patch::{mingw_patches, SourcePatch};
use crate::builder::plan::BuildPlan;
use crate::core::settings::Os;
use crate::util::fs::{ensure_dir, posix_path, remove_dir_all_if_exists};
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Autotools build adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutotoolsBackend {
    /// MinGW triple when cross-building under MSYS
    cross: Option<&'static str>,
}

impl AutotoolsBackend {
    pub fn native() -> Self {
        AutotoolsBackend { cross: None }
    }

    pub fn cross(triple: &'static str) -> Self {
        AutotoolsBackend {
            cross: Some(triple),
        }
    }

    /// A step running `program args...` in `cwd` with the plan's environment.
    fn command(&self, plan: &BuildPlan, cwd: &Path, program: &str, args: &[String]) -> ProcessBuilder {
        let cmd = match self.cross {
            Some(_) => {
                let mut script = format!("cd {} && {}", sh_quote(&posix_path(cwd)), sh_quote(program));
                for arg in args {
                    script.push(' ');
                    script.push_str(&sh_quote(arg));
                }
                ProcessBuilder::new("bash").arg("-lc").arg(script)
            }
            None => ProcessBuilder::new(program).args(args).cwd(cwd),
        };
        plan.env.apply(cmd)
    }

    fn runs_buildconf(&self, ctx: &BuildContext) -> bool {
        self.cross.is_some() || ctx.settings.os != Os::Macos
    }
}

impl BuildBackend for AutotoolsBackend {
    fn name(&self) -> &'static str {
        match self.cross {
            Some(_) => "mingw autotools",
            None => "autotools",
        }
    }

    fn patches(&self, ctx: &BuildContext) -> Result<Vec<SourcePatch>> {
        match self.cross {
            Some(_) => mingw_patches(&ctx.options, ctx.patches_dir.as_deref()),
            None => Ok(Vec::new()),
        }
    }

    fn configure(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner) -> Result<()> {
        if self.runs_buildconf(ctx) {
            let buildconf = posix_path(&ctx.source_dir.join("buildconf"));
            runner.run(&self.command(plan, &ctx.source_dir, &buildconf, &[]))?;
        }

        ensure_dir(&ctx.build_dir)?;
        let configure = posix_path(&ctx.source_dir.join("configure"));
        runner.run(&self.command(plan, &ctx.build_dir, &configure, &plan.args))
    }

    fn build(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner) -> Result<()> {
        let jobs = format!("-j{}", ctx.jobs());
        runner.run(&self.command(plan, &ctx.build_dir, "make", &[jobs]))
    }

    fn install(&self, ctx: &BuildContext, plan: &BuildPlan, runner: &dyn CommandRunner) -> Result<()> {
        runner.run(&self.command(plan, &ctx.build_dir, "make", &["install".to_string()]))?;
        if self.cross.is_some() {
            // man pages are not distributed
            remove_dir_all_if_exists(&ctx.package_dir.join("share").join("man"))?;
        }
        Ok(())
    }
}

/// Quote a word for `bash -c` when it contains anything but safe characters.
fn sh_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}
