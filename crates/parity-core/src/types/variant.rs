//! The two build pipelines under comparison.

use serde::{Deserialize, Serialize};

/// Which of the two alternate builds an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variant {
    /// The first pipeline (built first in every run)
    A,
    /// The second pipeline
    B,
}

impl Variant {
    /// Both variants, in build order.
    pub const ALL: [Self; 2] = [Self::A, Self::B];
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "variant A"),
            Self::B => write!(f, "variant B"),
        }
    }
}

/// Human-readable names for the two pipelines, used in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantLabels {
    /// Label for [`Variant::A`]
    pub a: String,
    /// Label for [`Variant::B`]
    pub b: String,
}

impl VariantLabels {
    /// Create labels for the two variants.
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Label of the given variant.
    #[must_use]
    pub fn get(&self, variant: Variant) -> &str {
        match variant {
            Variant::A => &self.a,
            Variant::B => &self.b,
        }
    }
}

impl Default for VariantLabels {
    fn default() -> Self {
        Self::new("variant A", "variant B")
    }
}
