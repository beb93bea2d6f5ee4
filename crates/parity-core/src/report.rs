//! Divergence report rendering.
//!
//! One line per divergence:
//!
//! ```text
//! <identifier> <reason> (ALLOWLISTED|NOT ALLOWLISTED)
//! ```
//!
//! The report is written to a per-product file, overwriting any previous
//! run, and echoed to a diagnostic stream.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{ParityError, Result};
use crate::summary::{ProductFailure, RunSummary};
use crate::types::{Classification, DivergenceEntry, Scope, Variant, VariantLabels, Verdict};

/// Prefix shown before installed image names.
pub const DEFAULT_IMAGE_PREFIX: &str = "$PRODUCT_OUT/";

/// Renders verdicts and run summaries as plain text.
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    labels: VariantLabels,
    image_prefix: String,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new(VariantLabels::default())
    }
}

impl ReportRenderer {
    /// Create a renderer using `labels` to name the two builds.
    #[must_use]
    pub fn new(labels: VariantLabels) -> Self {
        Self {
            labels,
            image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
        }
    }

    /// Override the prefix shown before installed image names.
    #[must_use]
    pub fn with_image_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_prefix = prefix.into();
        self
    }

    /// Labels naming the two builds.
    #[must_use]
    pub const fn labels(&self) -> &VariantLabels {
        &self.labels
    }

    /// Render a single divergence.
    #[must_use]
    pub fn line(&self, entry: &DivergenceEntry) -> String {
        let (identifier, location) = match entry.scope {
            Scope::Archive => (entry.identifier.clone(), "archive"),
            Scope::InstalledImage => (
                format!("{}{}", self.image_prefix, entry.identifier),
                "installed images",
            ),
        };

        let reason = match entry.classification {
            Classification::MissingInA => {
                format!("not found in {} build {location}", self.labels.get(Variant::A))
            }
            Classification::MissingInB => {
                format!("not found in {} build {location}", self.labels.get(Variant::B))
            }
            Classification::ValueMismatch => format!(
                "digest differs between {} build and {} build",
                self.labels.a, self.labels.b
            ),
        };

        let disposition = if entry.allowlisted {
            "ALLOWLISTED"
        } else {
            "NOT ALLOWLISTED"
        };

        format!("{identifier} {reason} ({disposition})")
    }

    /// Render every divergence of a verdict, one per line.
    #[must_use]
    pub fn render(&self, verdict: &Verdict) -> String {
        let mut out = String::new();
        for entry in verdict.entries() {
            out.push_str(&self.line(entry));
            out.push('\n');
        }
        out
    }

    /// Render `verdict` and persist it at `path`, replacing any previous report.
    ///
    /// Returns the rendered text.
    pub fn write_report(&self, path: &Path, verdict: &Verdict) -> Result<String> {
        let text = self.render(verdict);
        let to_err = |source: std::io::Error| ParityError::ReportWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(to_err)?;
        }
        std::fs::write(path, &text).map_err(to_err)?;

        info!(
            report = %path.display(),
            divergences = verdict.entries().len(),
            blocking = verdict.blocking().count(),
            "comparison report written"
        );
        Ok(text)
    }

    /// Copy rendered text to a diagnostic stream.
    pub fn echo<W: Write>(&self, text: &str, out: &mut W) -> std::io::Result<()> {
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    /// Render the triage summary of a multi-product run.
    ///
    /// Build failures come first (variant B, then variant A), then products
    /// whose artifacts diverged, then any other per-product failure.
    /// Passing products are not listed.
    #[must_use]
    pub fn render_summary(&self, summary: &RunSummary) -> String {
        let mut out = String::new();

        for variant in [Variant::B, Variant::A] {
            for outcome in summary.outcomes() {
                for failure in &outcome.failures {
                    if let ProductFailure::Build {
                        variant: v,
                        error,
                        log_tail,
                    } = failure
                    {
                        if *v != variant {
                            continue;
                        }
                        let _ = writeln!(
                            out,
                            "{}: {} build failed",
                            outcome.product,
                            self.labels.get(variant)
                        );
                        let _ = writeln!(out, "  {error}");
                        for line in log_tail {
                            let _ = writeln!(out, "    | {line}");
                        }
                    }
                }
            }
        }

        for outcome in summary.outcomes() {
            if outcome.diverged() {
                let _ = writeln!(
                    out,
                    "{}: archive and/or installed images differ",
                    outcome.product
                );
            }
        }

        for outcome in summary.outcomes() {
            for failure in &outcome.failures {
                if let ProductFailure::Other { variant, error } = failure {
                    match variant {
                        Some(v) => {
                            let _ = writeln!(
                                out,
                                "{}: {} build: {error}",
                                outcome.product,
                                self.labels.get(*v)
                            );
                        }
                        None => {
                            let _ = writeln!(out, "{}: {error}", outcome.product);
                        }
                    }
                }
            }
        }

        out
    }
}
