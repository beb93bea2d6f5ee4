//! `buildparity config` - inspect configuration.

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;

pub fn execute(ctx: Context, args: ConfigArgs) -> Result<ExitCode> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx)?,
        ConfigCommands::Path => show_path(&ctx)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn show_config(ctx: &Context) -> Result<()> {
    print!("{}", ctx.config.to_toml()?);
    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    let path = match &ctx.config_path {
        Some(p) => p.clone(),
        None => Config::default_path()?,
    };

    println!("{}", path.display());
    if !path.exists() {
        eprintln!("{}", "(file does not exist, using built-in defaults)".dimmed());
    }
    Ok(())
}
