//! curlpack CLI - build and package libcurl

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use curlpack::util::Shell;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("curlpack=debug")
    } else if cli.quiet {
        EnvFilter::new("curlpack=error")
    } else {
        EnvFilter::new("curlpack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color);

    // Execute command
    match cli.command {
        Commands::Options(args) => commands::options::execute(args),
        Commands::Requirements(args) => commands::requirements::execute(args),
        Commands::Flags(args) => commands::flags::execute(args),
        Commands::Create(args) => commands::create::execute(args, &shell),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Matrix(args) => commands::matrix::execute(args, &shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
