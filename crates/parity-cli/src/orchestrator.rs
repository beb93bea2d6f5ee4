//! Run orchestration: build, digest, compare and report, one product at a time.

use std::io::Write;

use colored::Colorize;
use parity_core::{
    collect_digests, read_archive_digests, verify_product, ArchiveDigests, ArtifactDigests,
    DigestMap, ParityError, ProductOutcome, ReportLayout, ReportRenderer, Result, RunSummary,
    Variant,
};
use tracing::{debug, error, info, warn};

use crate::build::{BuildProducer, Product};
use crate::config::Config;

/// Drives a [`BuildProducer`] through every requested product.
pub struct Orchestrator<'a, P: ?Sized> {
    producer: &'a P,
    config: &'a Config,
    layout: &'a ReportLayout,
    renderer: ReportRenderer,
}

impl<'a, P: BuildProducer + ?Sized> Orchestrator<'a, P> {
    /// Create an orchestrator.
    pub fn new(producer: &'a P, config: &'a Config, layout: &'a ReportLayout) -> Self {
        let renderer = ReportRenderer::new(config.labels()).with_image_prefix(&config.image_prefix);
        Self {
            producer,
            config,
            layout,
            renderer,
        }
    }

    /// Renderer used for reports and the summary.
    pub const fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }

    /// Verify every product in order, never stopping early.
    ///
    /// Reports go to `diag` as they are written when more than one product
    /// is processed. With a single product the report is echoed once, after
    /// the summary, by [`Orchestrator::finish`].
    pub async fn run<W: Write>(&self, products: &[Product], diag: &mut W) -> RunSummary {
        let echo_each = products.len() > 1;
        let mut summary = RunSummary::default();

        for product in products {
            let (outcome, text) = self.verify(product).await;
            if echo_each {
                if let Some(text) = text {
                    if let Err(e) = self.renderer.echo(&text, diag) {
                        warn!(error = %e, "could not echo report");
                    }
                }
            }
            info!(product = %product.name, passed = outcome.passed(), "product verified");
            let status = if outcome.passed() {
                "passed".green()
            } else {
                "failed".red()
            };
            if let Err(e) = writeln!(diag, "{} {}: {status}", "Completed".cyan().bold(), product.name) {
                warn!(error = %e, "could not write progress");
            }
            summary.push(outcome);
        }

        summary
    }

    /// Print the triage summary, plus the report of a lone product.
    pub fn finish<W: Write>(&self, summary: &RunSummary, diag: &mut W) -> std::io::Result<()> {
        let text = self.renderer.render_summary(summary);
        self.renderer.echo(&text, diag)?;

        if let [only] = summary.outcomes() {
            if let Some(path) = &only.report_path {
                match std::fs::read_to_string(path) {
                    Ok(report) => self.renderer.echo(&report, diag)?,
                    Err(e) => warn!(report = %path.display(), error = %e, "could not read report back"),
                }
            }
        }
        Ok(())
    }

    /// Verify one product. Returns its outcome and the rendered report, if any.
    pub async fn verify(&self, product: &Product) -> (ProductOutcome, Option<String>) {
        let mut outcome = ProductOutcome::new(&product.name);
        let mut digests: [Option<ArtifactDigests>; 2] = [None, None];

        // sequential: both variants install into the same output tree
        for (slot, variant) in digests.iter_mut().zip(Variant::ALL) {
            match self.collect(product, variant).await {
                Ok(d) => *slot = Some(d),
                Err(e) => {
                    error!(product = %product.name, %variant, error = %e, "variant unavailable");
                    outcome.fail(&e);
                }
            }
        }

        let [Some(a), Some(b)] = digests else {
            self.discard_report(&product.name);
            return (outcome, None);
        };

        let verdict = verify_product(&a, &b, &self.config.allowlist);
        let path = self.layout.report_path(&product.name);
        let text = match self.renderer.write_report(&path, &verdict) {
            Ok(text) => {
                outcome.report_path = Some(path);
                Some(text)
            }
            Err(e) => {
                error!(product = %product.name, error = %e, "report not written");
                outcome.fail(&e);
                None
            }
        };
        outcome.verdict = Some(verdict);
        (outcome, text)
    }

    /// Remove a report left by an earlier run of a product that could not be compared.
    fn discard_report(&self, product: &str) {
        let path = self.layout.report_path(product);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(report = %path.display(), "removed stale report"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(report = %path.display(), error = %e, "could not remove stale report"),
        }
    }

    /// Produce one variant and digest its artifacts right away.
    async fn collect(&self, product: &Product, variant: Variant) -> Result<ArtifactDigests> {
        let set = self.producer.produce(product, variant).await?;
        if !set.archive.is_file() {
            return Err(ParityError::ArtifactNotFound {
                variant,
                path: set.archive.display().to_string(),
            });
        }

        let (digests, excluded) = match &set.install_dir {
            Some(dir) => collect_digests(&set.archive, dir, &self.config.artifacts.installed_images).await?,
            None => {
                let ArchiveDigests { digests, excluded } = read_archive_digests(&set.archive)?;
                (
                    ArtifactDigests {
                        archive: digests,
                        images: DigestMap::new(),
                    },
                    excluded,
                )
            }
        };

        if !excluded.is_empty() {
            warn!(
                product = %product.name,
                %variant,
                count = excluded.len(),
                "archive entries excluded from comparison"
            );
        }
        info!(
            product = %product.name,
            %variant,
            archive_entries = digests.archive.len(),
            images = digests.images.len(),
            "digests collected"
        );
        Ok(digests)
    }
}
