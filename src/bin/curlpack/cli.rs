//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use curlpack::core::{Arch, BuildType, Compiler, DepPrefix, OptionOverride, Os};
use curlpack::util::shell::ColorChoice;

/// curlpack - build and package libcurl for any platform
#[derive(Parser)]
#[command(name = "curlpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the resolved option set for a configuration
    Options(OptionsArgs),

    /// Print the dependencies a configuration declares
    Requirements(RequirementsArgs),

    /// Print the build strategy, flags and environment for a configuration
    Flags(FlagsArgs),

    /// Fetch, build and package one configuration
    Create(CreateArgs),

    /// Print the link metadata consumers of the package get
    Info(InfoArgs),

    /// Enumerate the build matrix and build every configuration
    Matrix(MatrixArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Target platform and option overrides.
#[derive(Args, Clone, Debug, Default)]
pub struct ConfigArgs {
    /// Target operating system (defaults to the host)
    #[arg(long)]
    pub os: Option<Os>,

    /// Target architecture (defaults to the host)
    #[arg(long)]
    pub arch: Option<Arch>,

    /// Compiler family (defaults to the platform compiler)
    #[arg(long)]
    pub compiler: Option<Compiler>,

    /// Compiler version (detected when omitted)
    #[arg(long)]
    pub compiler_version: Option<String>,

    /// Release or Debug
    #[arg(long, default_value = "Release")]
    pub build_type: BuildType,

    /// libcurl version to package (defaults to the recipe version)
    #[arg(long)]
    pub lib_version: Option<String>,

    /// Option override, e.g. `-o shared=True` or `-o libcurl:with_ldap=true`
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<OptionOverride>,
}

/// Where dependency install information comes from.
#[derive(Args, Clone, Debug, Default)]
pub struct DepsArgs {
    /// Dependency install prefix, e.g. `--dep OpenSSL=/opt/openssl`
    #[arg(long = "dep", value_name = "NAME=PATH")]
    pub deps: Vec<DepPrefix>,

    /// TOML file describing installed dependencies
    #[arg(long)]
    pub deps_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct RequirementsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct FlagsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub deps: DepsArgs,

    /// Output the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub deps: DepsArgs,

    /// Work directory for sources, build and package
    #[arg(long, default_value = "build")]
    pub work_dir: PathBuf,

    /// Build an already unpacked source tree instead of downloading one
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Package output directory (defaults to <work-dir>/package)
    #[arg(long)]
    pub package_dir: Option<PathBuf>,

    /// Directory whose patch files replace the shipped ones
    #[arg(long)]
    pub patches_dir: Option<PathBuf>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Fail when a library pattern matches nothing
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub deps: DepsArgs,
}

#[derive(Args)]
pub struct MatrixArgs {
    /// Print the configurations as JSON instead of building them
    #[arg(long)]
    pub plan: bool,

    /// Upload packages built from a stable branch
    #[arg(long)]
    pub upload: bool,

    /// Configurations built at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Enumerate for this OS instead of the host
    #[arg(long)]
    pub os: Option<Os>,

    /// Parent directory of the per-configuration work directories
    #[arg(long, default_value = "matrix")]
    pub work_dir: PathBuf,

    #[command(flatten)]
    pub deps: DepsArgs,

    /// Fail a configuration when a library pattern matches nothing
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
