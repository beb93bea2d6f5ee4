//! `buildparity run` - build both variants of each product and compare.

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use super::{conclude, Context};
use crate::build::{CommandBuildProducer, Product};
use crate::cli::args::RunArgs;
use crate::orchestrator::Orchestrator;

pub async fn execute(ctx: Context, args: RunArgs) -> Result<ExitCode> {
    let release = args.release.unwrap_or_else(|| ctx.config.release.clone());
    let build_variant = args
        .build_variant
        .unwrap_or_else(|| ctx.config.build_variant.clone());

    let products: Vec<Product> = args
        .products
        .iter()
        .map(|name| Product::new(name, &release, &build_variant))
        .collect();

    let layout = ctx.layout();
    let producer = CommandBuildProducer::new(ctx.config.clone(), &ctx.out_dir, layout.clone());
    let orchestrator = Orchestrator::new(&producer, &ctx.config, &layout);

    eprintln!(
        "{} {} product(s): {} vs {} ({release}-{build_variant})",
        "Verifying".cyan().bold(),
        products.len(),
        ctx.config.variant_a.label,
        ctx.config.variant_b.label,
    );

    let mut stderr = std::io::stderr();
    let summary = orchestrator.run(&products, &mut stderr).await;
    orchestrator.finish(&summary, &mut stderr)?;

    for outcome in summary.outcomes() {
        if let Some(path) = &outcome.report_path {
            eprintln!("{} {}", "Report:".dimmed(), path.display());
        }
    }

    Ok(conclude(&ctx, &summary))
}
