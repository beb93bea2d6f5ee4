//! Core types for artifact verification.

pub mod divergence;
pub mod record;
pub mod variant;

pub use divergence::{Classification, DivergenceEntry, Scope, Verdict};
pub use record::{ContentDigest, DigestMap, DigestRecord, DIGEST_LEN};
pub use variant::{Variant, VariantLabels};
