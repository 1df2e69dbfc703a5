//! `curlpack info` command
//!
//! Prints the link metadata a package built for the configuration declares.

use anyhow::Result;

use crate::cli::InfoArgs;
use crate::commands::{load_deps, load_project_config, recipe, resolve_options, settings};
use curlpack::core::CppInfo;

pub fn execute(args: InfoArgs) -> Result<()> {
    let config = load_project_config()?;
    let recipe = recipe(&config, &args.config)?;
    let settings = settings(&args.config);
    let options = resolve_options(&recipe.version, &settings, &args.config)?;
    let deps = load_deps(&config, &args.deps)?;

    let info = CppInfo::declare(&options, &settings, &recipe.version, &deps)?;
    println!("# {} [{}]", recipe.reference(), settings);
    for (key, value) in recipe.about() {
        println!("# {}: {}", key, value);
    }
    println!();
    print!("{}", info.to_toml()?);
    Ok(())
}
