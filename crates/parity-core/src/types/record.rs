//! Digest records and the maps built from them.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

/// Length in bytes of a SHA-256 content digest.
pub const DIGEST_LEN: usize = 32;

/// A fixed-size SHA-256 content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a digest from a slice, if it has exactly [`DIGEST_LEN`] bytes.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; DIGEST_LEN]>::try_from(bytes).ok().map(Self)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// The comparison value recorded for one artifact.
///
/// A `Digest` and a `SymlinkTarget` never compare equal, even when their
/// bytes coincide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestRecord {
    /// Content digest of a regular file
    Digest(ContentDigest),
    /// Link target text of a symbolic link
    SymlinkTarget(Vec<u8>),
}

impl std::fmt::Display for DigestRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Digest(d) => write!(f, "{d}"),
            Self::SymlinkTarget(t) => write!(f, "-> {}", String::from_utf8_lossy(t)),
        }
    }
}

/// Mapping from artifact identifier to its [`DigestRecord`].
///
/// Absence of an identifier is meaningful: it is how a missing artifact is
/// told apart from one that is present with a different value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestMap {
    entries: BTreeMap<String, DigestRecord>,
}

impl DigestMap {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert a record, returning the previous one for this identifier.
    pub fn insert(&mut self, identifier: impl Into<String>, record: DigestRecord) -> Option<DigestRecord> {
        self.entries.insert(identifier.into(), record)
    }

    /// Look up the record for an identifier.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&DigestRecord> {
        self.entries.get(identifier)
    }

    /// Whether the identifier is present.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Identifiers in lexicographic order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(identifier, record)` pairs in lexicographic order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, DigestRecord> {
        self.entries.iter()
    }

    /// Number of identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no identifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, DigestRecord)> for DigestMap {
    fn from_iter<I: IntoIterator<Item = (S, DigestRecord)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DigestMap {
    type Item = (&'a String, &'a DigestRecord);
    type IntoIter = btree_map::Iter<'a, String, DigestRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
