//! Digest maps of standalone installed image files.
//!
//! Only the configured candidate names are considered. Candidates that do
//! not exist are skipped: not every product builds every partition.

use std::path::Path;

use tracing::debug;

use crate::error::{ParityError, Result};
use crate::hash::sha256_file;
use crate::types::{DigestMap, DigestRecord};

/// Image files checked by default, relative to the product install directory.
pub const DEFAULT_INSTALLED_IMAGES: &[&str] = &[
    "boot.img",
    "bootloader.img",
    "dtbo.img",
    "product.img",
    "pvmfw.img",
    "ramdisk.img",
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
    "vendor_kernel_boot.img",
    "vendor_kernel_ramdisk.img",
    "vendor_ramdisk.img",
];

/// Hash every candidate image present under `install_dir`.
///
/// Keys are the candidate names as given.
///
/// # Errors
///
/// Returns `ParityError::Io` if an existing image cannot be read.
pub async fn build_image_map<S: AsRef<str>>(install_dir: &Path, candidates: &[S]) -> Result<DigestMap> {
    let mut map = DigestMap::new();

    for name in candidates {
        let name = name.as_ref();
        let path = install_dir.join(name);
        let present = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| ParityError::io(&path, e))?;
        if !present {
            debug!(image = name, dir = %install_dir.display(), "image not built, skipping");
            continue;
        }

        let digest = sha256_file(&path).await?;
        debug!(image = name, %digest, "hashed installed image");
        map.insert(name, DigestRecord::Digest(digest));
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256_bytes;

    #[tokio::test]
    async fn hashes_present_images_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("boot.img"), b"boot").unwrap();
        std::fs::write(dir.path().join("vendor.img"), b"vendor").unwrap();
        std::fs::write(dir.path().join("unlisted.img"), b"ignored").unwrap();

        let map = build_image_map(dir.path(), DEFAULT_INSTALLED_IMAGES).await.unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get("boot.img"),
            Some(&DigestRecord::Digest(sha256_bytes(b"boot")))
        );
        assert!(map.contains("vendor.img"));
        assert!(!map.contains("dtbo.img"));
        assert!(!map.contains("unlisted.img"));
    }

    #[tokio::test]
    async fn missing_install_dir_yields_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let map = build_image_map(&dir.path().join("nope"), &["boot.img"])
            .await
            .unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn accepts_owned_candidate_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("super.img"), b"s").unwrap();
        let names = vec![String::from("super.img")];
        let map = build_image_map(dir.path(), &names).await.unwrap();
        assert!(map.contains("super.img"));
    }
}
