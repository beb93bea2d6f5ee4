//! # parity-core
//!
//! Verifies that two alternate build pipelines produce byte-identical
//! packaged output, and pinpoints where they do not.
//!
//! Trust evidence, not file names: every archive entry carries a SHA-256 of
//! its content in a private zip extra-field block, and every installed image
//! is hashed from disk. Two sets of digests are reconciled under a scoped
//! allowlist of known nondeterminism.
//!
//! ## Data Flow
//!
//! ```text
//! archive (zip)  -> extra::find_digest per entry -> archive::build_archive_map
//! install dir    -> hash::sha256_file per image  -> images::build_image_map
//!
//! variant A maps + variant B maps
//!   -> compare::verify_product (AllowlistPolicy, one allowlist per scope)
//!   -> Verdict (ordered DivergenceEntry list, passed = all allowlisted)
//!   -> report::ReportRenderer (comparison_report.txt + diagnostic echo)
//! ```
//!
//! Divergences are results, not errors. [`ParityError`] is reserved for
//! missing inputs, failed builds and I/O.

pub mod allowlist;
pub mod archive;
pub mod compare;
pub mod error;
pub mod extra;
pub mod hash;
pub mod images;
pub mod layout;
pub mod report;
pub mod summary;
pub mod types;

pub use allowlist::{Allowlist, AllowlistPolicy};
pub use archive::{read_archive_digests, ArchiveDigests, ArchiveEntry, Exclusion};
pub use compare::{compare_maps, verify_product, ArtifactDigests};
pub use error::{ParityError, Result};
pub use layout::ReportLayout;
pub use report::ReportRenderer;
pub use summary::{ProductFailure, ProductOutcome, RunSummary};
pub use types::*;

use std::path::Path;

/// Read one variant's archive and installed images into digest maps.
///
/// Entries excluded from the archive map are returned alongside.
///
/// # Errors
///
/// Returns `ParityError` if the archive cannot be read or an existing image
/// cannot be hashed. Missing candidate images are not errors.
pub async fn collect_digests<S: AsRef<str>>(
    archive: &Path,
    install_dir: &Path,
    image_candidates: &[S],
) -> Result<(ArtifactDigests, Vec<Exclusion>)> {
    let ArchiveDigests { digests, excluded } = read_archive_digests(archive)?;
    let images = images::build_image_map(install_dir, image_candidates).await?;
    Ok((
        ArtifactDigests {
            archive: digests,
            images,
        },
        excluded,
    ))
}
