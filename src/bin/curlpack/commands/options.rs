//! `curlpack options` command

use anyhow::{Context, Result};

use crate::cli::OptionsArgs;
use crate::commands::{load_project_config, recipe, resolve_options, settings};

pub fn execute(args: OptionsArgs) -> Result<()> {
    let config = load_project_config()?;
    let recipe = recipe(&config, &args.config)?;
    let settings = settings(&args.config);
    let options = resolve_options(&recipe.version, &settings, &args.config)?;

    if args.json {
        let json = serde_json::to_string_pretty(&options.to_map())
            .context("failed to serialize options")?;
        println!("{}", json);
        return Ok(());
    }

    println!("# {} [{}]", recipe.reference(), settings);
    for (key, value) in options.iter() {
        println!("{} = {}", key, value);
    }
    Ok(())
}
