//! Command implementations.

pub mod compare;
pub mod config;
pub mod digests;
pub mod run;

use colored::Colorize;
use parity_core::{ReportLayout, RunSummary};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::Config;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration
    pub config: Config,

    /// Explicit configuration file, if one was given
    pub config_path: Option<PathBuf>,

    /// Build output directory
    pub out_dir: PathBuf,

    /// Distribution directory
    pub dist_dir: PathBuf,

    /// Verbosity level
    pub verbose: u8,
}

impl Context {
    /// Where per-product results are written.
    #[must_use]
    pub fn layout(&self) -> ReportLayout {
        ReportLayout::new(&self.dist_dir, &self.config.report_dir_name)
    }
}

/// Print the final verdict line and map the run to an exit status.
pub(crate) fn conclude(ctx: &Context, summary: &RunSummary) -> ExitCode {
    let labels = ctx.config.labels();
    if summary.passed() {
        println!(
            "{} artifacts are identical between {} build and {} build",
            "OK".green().bold(),
            labels.a,
            labels.b
        );
        ExitCode::SUCCESS
    } else {
        let failed = summary.outcomes().iter().filter(|o| !o.passed()).count();
        eprintln!(
            "{} {failed} of {} product(s) failed verification",
            "FAILED".red().bold(),
            summary.outcomes().len()
        );
        ExitCode::from(u8::try_from(summary.exit_code()).unwrap_or(1))
    }
}
