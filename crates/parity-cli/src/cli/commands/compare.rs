//! `buildparity compare` - compare artifacts that were already built.

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use super::{conclude, Context};
use crate::build::{BuildArtifactSet, PrebuiltProducer, Product};
use crate::cli::args::CompareArgs;
use crate::orchestrator::Orchestrator;

pub async fn execute(ctx: Context, args: CompareArgs) -> Result<ExitCode> {
    let producer = PrebuiltProducer::new(
        BuildArtifactSet {
            archive: args.archive_a,
            install_dir: args.images_a,
        },
        BuildArtifactSet {
            archive: args.archive_b,
            install_dir: args.images_b,
        },
    );
    let product = Product::new(args.product, &ctx.config.release, &ctx.config.build_variant);

    let layout = ctx.layout();
    if ctx.verbose > 0 {
        eprintln!(
            "{} {}",
            "Reports under".dimmed(),
            layout.product_dir(&product.name).display()
        );
    }

    let orchestrator = Orchestrator::new(&producer, &ctx.config, &layout);
    let mut stderr = std::io::stderr();
    let summary = orchestrator.run(std::slice::from_ref(&product), &mut stderr).await;
    orchestrator.finish(&summary, &mut stderr)?;

    Ok(conclude(&ctx, &summary))
}
