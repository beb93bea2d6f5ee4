//! Reconciled differences between two digest maps.

use serde::{Deserialize, Serialize};

/// Which family of artifacts a digest map describes.
///
/// Each scope has its own allowlist; the two are never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    /// Entries inside the packaged archive
    Archive,
    /// Standalone installed image files
    InstalledImage,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::InstalledImage => write!(f, "installed images"),
        }
    }
}

/// How an identifier differs between the two maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    /// Present only in the variant B map
    MissingInA,
    /// Present only in the variant A map
    MissingInB,
    /// Present in both with different records
    ValueMismatch,
}

/// One reconciled observation.
///
/// Ordering is by scope, then identifier, so a combined report lists all
/// archive entries before installed images.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DivergenceEntry {
    /// Artifact family
    pub scope: Scope,
    /// Artifact identifier (archive path or image file name)
    pub identifier: String,
    /// Kind of divergence
    pub classification: Classification,
    /// Whether the identifier is permitted to diverge
    pub allowlisted: bool,
}

/// Outcome of comparing one product's artifacts.
///
/// Holds every divergence, allowlisted or not, so the report is a complete
/// record. `passed` is derived, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    entries: Vec<DivergenceEntry>,
}

impl Verdict {
    /// Build a verdict from divergence entries, sorting them.
    #[must_use]
    pub fn from_entries(mut entries: Vec<DivergenceEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// True iff every divergence is allowlisted.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.entries.iter().all(|e| e.allowlisted)
    }

    /// All divergences in report order.
    #[must_use]
    pub fn entries(&self) -> &[DivergenceEntry] {
        &self.entries
    }

    /// Divergences that fail verification.
    pub fn blocking(&self) -> impl Iterator<Item = &DivergenceEntry> {
        self.entries.iter().filter(|e| !e.allowlisted)
    }

    /// Fold another pass into this verdict.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
        self.entries.sort();
    }

    /// Whether no divergence was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
