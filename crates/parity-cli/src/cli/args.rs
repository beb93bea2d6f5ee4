//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Verify that two build pipelines produce byte-identical artifacts
///
/// Builds each product twice, once per pipeline variant, then compares the
/// per-entry content digests of the packaged archives and the hashes of the
/// installed images. Differences outside the allowlists fail the run.
#[derive(Parser, Debug)]
#[command(name = "buildparity")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, env = "BUILDPARITY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Build output directory
    #[arg(long, env = "OUT_DIR", default_value = "out", global = true)]
    pub out_dir: PathBuf,

    /// Distribution directory [default: <OUT_DIR>/dist]
    #[arg(long, env = "DIST_DIR", global = true)]
    pub dist_dir: Option<PathBuf>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build every product with both variants and compare the results
    Run(RunArgs),

    /// Compare artifacts that were already built
    Compare(CompareArgs),

    /// Print the digest map of one archive
    Digests(DigestsArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

// ============================================================================
// Run command
// ============================================================================

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Products to verify, processed in order
    #[arg(required = true)]
    pub products: Vec<String>,

    /// Release configuration (overrides the config file)
    #[arg(long)]
    pub release: Option<String>,

    /// Build variant: user, userdebug or eng (overrides the config file)
    #[arg(long)]
    pub build_variant: Option<String>,
}

// ============================================================================
// Compare command
// ============================================================================

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Archive produced by variant A
    #[arg(long)]
    pub archive_a: PathBuf,

    /// Archive produced by variant B
    #[arg(long)]
    pub archive_b: PathBuf,

    /// Installed images of variant A
    #[arg(long, requires = "images_b")]
    pub images_a: Option<PathBuf>,

    /// Installed images of variant B
    #[arg(long, requires = "images_a")]
    pub images_b: Option<PathBuf>,

    /// Name used for the report directory
    #[arg(long, default_value = "adhoc")]
    pub product: String,
}

// ============================================================================
// Digests command
// ============================================================================

#[derive(Args, Debug)]
pub struct DigestsArgs {
    /// Archive to read
    pub archive: PathBuf,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}
