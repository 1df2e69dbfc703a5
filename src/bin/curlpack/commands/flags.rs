//! `curlpack flags` command

use anyhow::{Context, Result};

use crate::cli::FlagsArgs;
use crate::commands::{build_context, load_project_config};
use curlpack::builder::BuildPlan;

pub fn execute(args: FlagsArgs) -> Result<()> {
    let config = load_project_config()?;
    let work_dir = std::env::current_dir()
        .context("failed to get current directory")?
        .join("build");
    let ctx = build_context(&config, &args.config, &args.deps, &work_dir)?;
    let plan = BuildPlan::new(&ctx)?;

    if args.json {
        let json = serde_json::to_string_pretty(&plan).context("failed to serialize build plan")?;
        println!("{}", json);
        return Ok(());
    }

    println!("# Strategy: {}", plan.strategy);
    println!();
    println!("# Arguments:");
    for arg in &plan.args {
        println!("  {}", arg);
    }

    if !plan.env.is_empty() {
        println!();
        println!("# Environment:");
        for (key, value) in plan.env.vars() {
            println!("  {}={}", key, value);
        }
        for key in plan.env.removed() {
            println!("  unset {}", key);
        }
    }
    Ok(())
}
