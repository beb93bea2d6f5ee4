//! Error types for artifact verification.
//!
//! Divergences are never errors: they are the structured output of
//! [`crate::compare`]. Errors here cover missing inputs, failed builds and
//! I/O that prevents a product from being compared at all.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::extra::MalformedExtraField;
use crate::types::Variant;

/// Result type alias for verification operations.
pub type Result<T> = std::result::Result<T, ParityError>;

/// Errors that can occur while producing, reading or reporting artifacts.
#[derive(Error, Debug)]
pub enum ParityError {
    /// An archive or image the build claimed to produce is not where expected.
    #[error("{variant} artifact not found: {path}")]
    ArtifactNotFound {
        /// Which build produced (or should have produced) the artifact
        variant: Variant,
        /// Path or glob pattern that was searched
        path: String,
    },

    /// The external build invocation exited unsuccessfully.
    #[error("{variant} build failed ({status}), log: {}", log_path.display())]
    BuildFailure {
        /// Which build failed
        variant: Variant,
        /// Exit status description
        status: String,
        /// Captured build log
        log_path: PathBuf,
    },

    /// The comparison report could not be persisted.
    #[error("failed to write report {}: {source}", path.display())]
    ReportWrite {
        /// Report destination
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The archive container itself could not be read.
    #[error("failed to read archive {}: {source}", path.display())]
    Archive {
        /// Archive location
        path: PathBuf,
        /// Underlying zip error
        #[source]
        source: zip::result::ZipError,
    },

    /// An entry's extra field could not be decoded.
    ///
    /// Tolerated by the map builders: the entry is excluded and the run goes on.
    #[error("malformed extra field in {entry}: {source}")]
    MalformedExtraField {
        /// Archive entry path
        entry: String,
        /// Decoding failure
        #[source]
        source: MalformedExtraField,
    },

    /// Filesystem I/O failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ParityError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Wrap a zip error with the archive it occurred on.
    pub fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }

    /// The build variant this error is attributed to, if any.
    #[must_use]
    pub const fn variant(&self) -> Option<Variant> {
        match self {
            Self::ArtifactNotFound { variant, .. } | Self::BuildFailure { variant, .. } => {
                Some(*variant)
            }
            _ => None,
        }
    }

    /// Returns true if the error is an unsuccessful build invocation.
    #[must_use]
    pub const fn is_build_failure(&self) -> bool {
        matches!(self, Self::BuildFailure { .. })
    }
}
