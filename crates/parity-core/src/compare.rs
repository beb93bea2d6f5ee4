//! Reconcile two digest maps under an allowlist.
//!
//! Keys from both sides are unioned and walked in lexicographic order. Each
//! key yields at most one [`DivergenceEntry`]; exact matches yield none.

use std::collections::BTreeSet;

use tracing::debug;

use crate::allowlist::{Allowlist, AllowlistPolicy};
use crate::types::{Classification, DigestMap, DivergenceEntry, Scope, Verdict};

/// Classify one identifier, or `None` if both sides agree.
fn classify(a: &DigestMap, b: &DigestMap, identifier: &str) -> Option<Classification> {
    match (a.get(identifier), b.get(identifier)) {
        (Some(_), None) => Some(Classification::MissingInB),
        (None, Some(_)) => Some(Classification::MissingInA),
        (Some(x), Some(y)) if x != y => Some(Classification::ValueMismatch),
        _ => None,
    }
}

/// Compare the variant A map `a` against the variant B map `b`.
#[must_use]
pub fn compare_maps(scope: Scope, a: &DigestMap, b: &DigestMap, allowlist: &Allowlist) -> Verdict {
    let keys: BTreeSet<&str> = a.identifiers().chain(b.identifiers()).collect();

    let entries: Vec<DivergenceEntry> = keys
        .into_iter()
        .filter_map(|id| {
            classify(a, b, id).map(|classification| DivergenceEntry {
                scope,
                identifier: id.to_string(),
                classification,
                allowlisted: allowlist.contains(id),
            })
        })
        .collect();

    debug!(
        %scope,
        left = a.len(),
        right = b.len(),
        divergences = entries.len(),
        "compared digest maps"
    );

    Verdict::from_entries(entries)
}

/// Digest maps of one variant's build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactDigests {
    /// Entries of the packaged archive
    pub archive: DigestMap,
    /// Standalone installed images
    pub images: DigestMap,
}

/// Compare both scopes of a product and fold them into one verdict.
///
/// Each scope is judged by its own allowlist.
#[must_use]
pub fn verify_product(a: &ArtifactDigests, b: &ArtifactDigests, policy: &AllowlistPolicy) -> Verdict {
    let mut verdict = compare_maps(
        Scope::Archive,
        &a.archive,
        &b.archive,
        policy.for_scope(Scope::Archive),
    );
    verdict.merge(compare_maps(
        Scope::InstalledImage,
        &a.images,
        &b.images,
        policy.for_scope(Scope::InstalledImage),
    ));
    verdict
}
