//! `curlpack requirements` command

use anyhow::Result;

use crate::cli::RequirementsArgs;
use crate::commands::{load_project_config, recipe, resolve_options, settings};
use curlpack::core::{declare_build_requirements, declare_requirements};

pub fn execute(args: RequirementsArgs) -> Result<()> {
    let config = load_project_config()?;
    let recipe = recipe(&config, &args.config)?;
    let settings = settings(&args.config);
    let options = resolve_options(&recipe.version, &settings, &args.config)?;

    println!("# Requirements for {} [{}]:", recipe.reference(), settings);
    for req in declare_requirements(&options, &settings) {
        println!("  {}", req);
    }

    let build_reqs = declare_build_requirements(&settings);
    if !build_reqs.is_empty() {
        println!();
        println!("# Build requirements:");
        for req in build_reqs {
            println!("  {}", req);
        }
    }
    Ok(())
}
