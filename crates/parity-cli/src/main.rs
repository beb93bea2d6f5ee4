//! buildparity - verify that two build pipelines produce identical artifacts.

use anyhow::Result;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    parity_cli::run().await
}
