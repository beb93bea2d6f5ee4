//! Identifiers permitted to diverge.
//!
//! Each entry is a known, accepted source of nondeterminism. Matching is
//! exact: no globbing, no prefix matching.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::Scope;

/// Archive entries allowed to differ by default.
pub const DEFAULT_ARCHIVE_ALLOWLIST: &[&str] = &[
    "IMAGES/system.img",
    "IMAGES/userdata.img",
    "IMAGES/vbmeta_system.img",
    "META/apkcerts.txt",
    "META/misc_info.txt",
    "META/vbmeta_digest.txt",
];

/// Installed images allowed to differ by default.
// TODO: shrink as the remaining partition builds become reproducible.
pub const DEFAULT_IMAGE_ALLOWLIST: &[&str] = &[
    "product.img",
    "system_dlkm.img",
    "system_ext.img",
    "system_other.img",
    "system.img",
    "userdata.img",
    "vbmeta.img",
    "vbmeta_system.img",
    "vbmeta_vendor.img",
    "vendor_boot.img",
    "vendor_dlkm.img",
    "vendor.img",
    "vendor_kernel_ramdisk.img",
    "vendor_ramdisk.img",
];

/// A set of exempt identifiers for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allowlist {
    entries: BTreeSet<String>,
}

impl Allowlist {
    /// Whether `identifier` may diverge without failing verification.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains(identifier)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the allowlist is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Allowlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// The two allowlists, kept apart by scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistPolicy {
    /// Applies to archive entries only
    #[serde(default = "default_archive_allowlist")]
    pub archive: Allowlist,
    /// Applies to installed images only
    #[serde(default = "default_image_allowlist")]
    pub images: Allowlist,
}

// Default value functions for serde: an omitted list keeps its built-in entries.
fn default_archive_allowlist() -> Allowlist {
    DEFAULT_ARCHIVE_ALLOWLIST.iter().copied().collect()
}

fn default_image_allowlist() -> Allowlist {
    DEFAULT_IMAGE_ALLOWLIST.iter().copied().collect()
}

impl AllowlistPolicy {
    /// Build a policy from the two lists.
    #[must_use]
    pub const fn new(archive: Allowlist, images: Allowlist) -> Self {
        Self { archive, images }
    }

    /// A policy that allows nothing.
    #[must_use]
    pub fn strict() -> Self {
        Self::new(Allowlist::default(), Allowlist::default())
    }

    /// The allowlist governing `scope`.
    #[must_use]
    pub const fn for_scope(&self, scope: Scope) -> &Allowlist {
        match scope {
            Scope::Archive => &self.archive,
            Scope::InstalledImage => &self.images,
        }
    }
}

impl Default for AllowlistPolicy {
    fn default() -> Self {
        Self::new(default_archive_allowlist(), default_image_allowlist())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_only() {
        let list: Allowlist = ["META/misc_info.txt"].into_iter().collect();
        assert!(list.contains("META/misc_info.txt"));
        assert!(!list.contains("META/"));
        assert!(!list.contains("meta/misc_info.txt"));
        assert!(!list.contains("META/misc_info.txt.bak"));
    }

    #[test]
    fn scopes_are_not_conflated() {
        let policy = AllowlistPolicy::default();
        // allowlisted as an image, not as an archive entry
        assert!(policy.for_scope(Scope::InstalledImage).contains("vendor.img"));
        assert!(!policy.for_scope(Scope::Archive).contains("vendor.img"));
        assert!(policy.for_scope(Scope::Archive).contains("IMAGES/system.img"));
        assert!(!policy.for_scope(Scope::InstalledImage).contains("IMAGES/system.img"));
    }

    #[test]
    fn default_lists_are_separate_entries() {
        let policy = AllowlistPolicy::default();
        assert_eq!(policy.archive.len(), DEFAULT_ARCHIVE_ALLOWLIST.len());
        assert_eq!(policy.images.len(), DEFAULT_IMAGE_ALLOWLIST.len());
        assert!(policy.images.contains("vendor_kernel_ramdisk.img"));
        assert!(policy.images.contains("vendor_ramdisk.img"));
    }

    #[test]
    fn strict_policy_is_empty() {
        let policy = AllowlistPolicy::strict();
        assert!(policy.archive.is_empty());
        assert!(policy.images.is_empty());
    }

    #[test]
    fn deserializes_from_plain_lists() {
        let json = r#"{"archive":["a","b"],"images":["x.img"]}"#;
        let policy: AllowlistPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.archive.iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(policy.images.contains("x.img"));
    }

    #[test]
    fn omitted_list_keeps_its_defaults() {
        let policy: AllowlistPolicy = serde_json::from_str(r#"{"archive":["a"]}"#).unwrap();
        assert_eq!(policy.archive.len(), 1);
        assert_eq!(policy.images, default_image_allowlist());

        let policy: AllowlistPolicy = serde_json::from_str(r#"{"images":[]}"#).unwrap();
        assert!(policy.images.is_empty());
        assert_eq!(policy.archive.len(), DEFAULT_ARCHIVE_ALLOWLIST.len());
    }
}
