//! # parity-cli
//!
//! Command-line front end for build artifact parity checks.
//!
//! ## Features
//!
//! - **run**: build each product with both pipeline variants, then compare
//! - **compare**: compare archives and image directories built elsewhere
//! - **digests**: dump the per-entry digests embedded in one archive
//! - **config**: show the effective TOML configuration
//!
//! Exit status is 0 when every product passed and 1 otherwise.

pub mod build;
pub mod cli;
pub mod config;
pub mod orchestrator;

#[cfg(test)]
mod testutil;

pub use cli::run;
