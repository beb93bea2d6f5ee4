//! Per-product outcomes of a multi-product run.

use std::path::PathBuf;

use crate::error::ParityError;
use crate::types::{Variant, Verdict};

/// Number of trailing build log lines kept for triage.
pub const LOG_TAIL_LINES: usize = 10;

/// Why a product could not be verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductFailure {
    /// The external build exited unsuccessfully
    Build {
        /// Which build failed
        variant: Variant,
        /// Error description, including the log path
        error: String,
        /// Last lines of the captured build log
        log_tail: Vec<String>,
    },
    /// Anything else: missing artifacts, unreadable archives, report I/O
    Other {
        /// Which build the failure is attributed to, if any
        variant: Option<Variant>,
        /// Error description
        error: String,
    },
}

impl ProductFailure {
    /// Record a failure from an error.
    ///
    /// Build failures pick up the tail of their captured log when readable.
    #[must_use]
    pub fn from_error(err: &ParityError) -> Self {
        match err {
            ParityError::BuildFailure {
                variant, log_path, ..
            } => Self::Build {
                variant: *variant,
                error: err.to_string(),
                log_tail: read_log_tail(log_path, LOG_TAIL_LINES),
            },
            _ => Self::Other {
                variant: err.variant(),
                error: err.to_string(),
            },
        }
    }
}

fn read_log_tail(path: &std::path::Path, lines: usize) -> Vec<String> {
    std::fs::read(path).map_or_else(
        |_| Vec::new(),
        |bytes| {
            let text = String::from_utf8_lossy(&bytes);
            let all: Vec<&str> = text.lines().collect();
            all[all.len().saturating_sub(lines)..]
                .iter()
                .map(|l| (*l).to_string())
                .collect()
        },
    )
}

/// What happened to one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductOutcome {
    /// Product name
    pub product: String,
    /// Failures that prevented or interrupted verification
    pub failures: Vec<ProductFailure>,
    /// Comparison result, present when both builds produced artifacts
    pub verdict: Option<Verdict>,
    /// Persisted report, if one was written
    pub report_path: Option<PathBuf>,
}

impl ProductOutcome {
    /// Start recording a product.
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            failures: Vec::new(),
            verdict: None,
            report_path: None,
        }
    }

    /// Record a failure.
    pub fn fail(&mut self, err: &ParityError) {
        self.failures.push(ProductFailure::from_error(err));
    }

    /// Whether the given variant's build failed.
    #[must_use]
    pub fn build_failed(&self, variant: Variant) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f, ProductFailure::Build { variant: v, .. } if *v == variant))
    }

    /// Whether the comparison found a non-allowlisted divergence.
    #[must_use]
    pub fn diverged(&self) -> bool {
        self.verdict.as_ref().is_some_and(|v| !v.passed())
    }

    /// Verified with no failures and a passing verdict.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.verdict.as_ref().is_some_and(Verdict::passed)
    }
}

/// Outcomes of every product in a run, in the order processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    outcomes: Vec<ProductOutcome>,
}

impl RunSummary {
    /// Append a product's outcome.
    pub fn push(&mut self, outcome: ProductOutcome) {
        self.outcomes.push(outcome);
    }

    /// All outcomes.
    #[must_use]
    pub fn outcomes(&self) -> &[ProductOutcome] {
        &self.outcomes
    }

    /// Whether every product passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(ProductOutcome::passed)
    }

    /// Process exit status for the run.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.passed())
    }
}
