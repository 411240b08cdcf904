//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// flakeforge - reproducible nix development environments
#[derive(Parser, Debug)]
#[command(name = "flakeforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show full error details and let nix and git write to the terminal
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to flakeforge.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the environment files from a build plan
    Generate(GenerateArgs),

    /// Manage the project's nix profile
    #[command(subcommand)]
    Profile(ProfileCommands),
}

// Generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Build plan produced by the planner (JSON)
    #[arg(long)]
    pub plan: Utf8PathBuf,
}

// Profile commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List installed packages
    List(ProfileListArgs),

    /// Install a package
    Add(ProfileAddArgs),

    /// Remove packages by index
    Remove(ProfileRemoveArgs),

    /// Show the priority the next install would get
    Priority,
}

#[derive(Args, Debug)]
pub struct ProfileListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ProfileAddArgs {
    /// Installable, e.g. nixpkgs#hello
    pub installable: String,

    /// Do not hit the network
    #[arg(long)]
    pub offline: bool,

    /// Install even if the package has known vulnerabilities
    #[arg(long)]
    pub allow_insecure: bool,

    /// Abort the install after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ProfileRemoveArgs {
    /// Element indexes as shown by `profile list`
    #[arg(required = true, num_args = 1..)]
    pub indexes: Vec<String>,
}
