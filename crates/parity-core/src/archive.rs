//! Digest maps from packaged archives.
//!
//! Every non-directory entry contributes its embedded digest (or symlink
//! target). Entries without either are excluded and logged rather than
//! failing the build of the map.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{ParityError, Result};
use crate::extra::{resolve_entry, EntryValue, MalformedExtraField};
use crate::types::DigestMap;

/// One packaged-file record, as read from the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Forward-slash separated path, unique within the archive
    pub path: String,
    /// Whether the entry is a directory
    pub is_directory: bool,
    /// Upper 16 bits hold the POSIX file mode
    pub external_attributes: u32,
    /// Raw extra-field bytes, possibly empty
    pub raw_extra_data: Vec<u8>,
}

/// Random access to the entries of an archive.
pub trait EntrySource {
    /// Number of entries.
    fn entry_count(&self) -> usize;

    /// Metadata of the entry at `index`.
    fn entry(&mut self, index: usize) -> Result<ArchiveEntry>;

    /// Decompressed content of the entry at `index`.
    fn read_payload(&mut self, index: usize) -> Result<Vec<u8>>;
}

/// [`EntrySource`] backed by a zip archive.
pub struct ZipSource<R> {
    archive: ZipArchive<R>,
    path: PathBuf,
}

impl ZipSource<File> {
    /// Open a zip archive on disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ParityError::io(path, e))?;
        Self::new(file, path)
    }
}

impl<R: Read + Seek> ZipSource<R> {
    /// Read the central directory from `reader`; `path` is used in errors.
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let archive = ZipArchive::new(reader).map_err(|e| ParityError::archive(&path, e))?;
        Ok(Self { archive, path })
    }
}

impl<R: Read + Seek> EntrySource for ZipSource<R> {
    fn entry_count(&self) -> usize {
        self.archive.len()
    }

    fn entry(&mut self, index: usize) -> Result<ArchiveEntry> {
        let file = self
            .archive
            .by_index_raw(index)
            .map_err(|e| ParityError::archive(&self.path, e))?;

        Ok(ArchiveEntry {
            path: file.name().to_string(),
            is_directory: file.is_dir(),
            // `unix_mode` is `None` unless "version made by" says Unix, so
            // symlinks in archives made on other systems are not recognised.
            // Packaging tools here always write Unix entries.
            external_attributes: file.unix_mode().map_or(0, |mode| mode << 16),
            raw_extra_data: file.extra_data().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    fn read_payload(&mut self, index: usize) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_index(index)
            .map_err(|e| ParityError::archive(&self.path, e))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| ParityError::io(&self.path, e))?;
        Ok(buf)
    }
}

/// An entry left out of the digest map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    /// Entry path
    pub path: String,
    /// Decoding error, if the extra field was damaged rather than just lacking a digest
    #[serde(serialize_with = "serialize_reason")]
    pub reason: Option<MalformedExtraField>,
}

fn serialize_reason<S: serde::Serializer>(
    reason: &Option<MalformedExtraField>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match reason {
        Some(m) => s.serialize_some(&m.to_string()),
        None => s.serialize_none(),
    }
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(m) => write!(f, "{}: {m}", self.path),
            None => write!(f, "{}: no embedded digest", self.path),
        }
    }
}

/// Digest map of one archive plus the entries that could not contribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveDigests {
    /// Identifier to record
    pub digests: DigestMap,
    /// Non-directory entries without a digest or symlink target
    pub excluded: Vec<Exclusion>,
}

/// Build the digest map of every non-directory entry in `source`.
///
/// Directories never appear in the map. A missing or damaged digest
/// excludes only that entry; container-level read errors abort.
pub fn build_archive_map<S: EntrySource>(source: &mut S) -> Result<ArchiveDigests> {
    let mut out = ArchiveDigests::default();

    for index in 0..source.entry_count() {
        let entry = source.entry(index)?;
        if entry.is_directory {
            continue;
        }

        let value = resolve_entry(&entry.raw_extra_data, entry.external_attributes, || {
            source.read_payload(index)
        })?;

        match value {
            EntryValue::Record(record) => {
                out.digests.insert(entry.path, record);
            }
            EntryValue::Excluded(reason) => {
                match &reason {
                    Some(m) => {
                        let err = ParityError::MalformedExtraField {
                            entry: entry.path.clone(),
                            source: *m,
                        };
                        warn!(error = %err, "entry excluded from digest map");
                    }
                    None => warn!(entry = %entry.path, "digest not found, entry excluded"),
                }
                out.excluded.push(Exclusion {
                    path: entry.path,
                    reason,
                });
            }
        }
    }

    Ok(out)
}

/// Open the zip at `path` and build its digest map.
pub fn read_archive_digests(path: &Path) -> Result<ArchiveDigests> {
    debug!(archive = %path.display(), "reading archive digests");
    let mut source = ZipSource::open(path)?;
    let digests = build_archive_map(&mut source)?;
    debug!(
        archive = %path.display(),
        entries = digests.digests.len(),
        excluded = digests.excluded.len(),
        "archive digest map built"
    );
    Ok(digests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extra::{MalformedKind, DIGEST_HEADER_ID, DIGEST_SIGNATURE};
    use crate::types::{ContentDigest, DigestRecord};
    use std::io::{Cursor, Write};
    use zip::write::{ExtendedFileOptions, FileOptions, SimpleFileOptions};
    use zip::ZipWriter;

    const FILE_ATTRS: u32 = 0o100_644 << 16;
    const LINK_ATTRS: u32 = 0o120_777 << 16;

    /// In-memory archive for exercising the builder without a zip container.
    struct MemoryArchive {
        entries: Vec<(ArchiveEntry, Vec<u8>)>,
    }

    impl EntrySource for MemoryArchive {
        fn entry_count(&self) -> usize {
            self.entries.len()
        }

        fn entry(&mut self, index: usize) -> Result<ArchiveEntry> {
            Ok(self.entries[index].0.clone())
        }

        fn read_payload(&mut self, index: usize) -> Result<Vec<u8>> {
            Ok(self.entries[index].1.clone())
        }
    }

    fn digest_payload(digest: [u8; 32]) -> Vec<u8> {
        let mut payload = DIGEST_SIGNATURE.to_le_bytes().to_vec();
        payload.extend_from_slice(&digest);
        payload
    }

    fn digest_extra(digest: [u8; 32]) -> Vec<u8> {
        let payload = digest_payload(digest);
        let mut out = DIGEST_HEADER_ID.to_le_bytes().to_vec();
        out.extend_from_slice(&u16::try_from(payload.len()).unwrap().to_le_bytes());
        out.extend(payload);
        out
    }

    fn mem_entry(path: &str, is_directory: bool, attrs: u32, extra: Vec<u8>) -> (ArchiveEntry, Vec<u8>) {
        (
            ArchiveEntry {
                path: path.into(),
                is_directory,
                external_attributes: attrs,
                raw_extra_data: extra,
            },
            Vec::new(),
        )
    }

    #[test]
    fn directories_never_appear() {
        let mut archive = MemoryArchive {
            entries: vec![
                mem_entry("SYSTEM/", true, 0o040_755 << 16, digest_extra([1; 32])),
                mem_entry("SYSTEM/build.prop", false, FILE_ATTRS, digest_extra([2; 32])),
            ],
        };
        let built = build_archive_map(&mut archive).unwrap();
        assert!(!built.digests.contains("SYSTEM/"));
        assert_eq!(built.digests.len(), 1);
        assert!(built.excluded.is_empty());
    }

    #[test]
    fn missing_digest_excludes_only_that_entry() {
        let mut archive = MemoryArchive {
            entries: vec![
                mem_entry("a", false, FILE_ATTRS, Vec::new()),
                mem_entry("b", false, FILE_ATTRS, digest_extra([2; 32])),
                mem_entry("c", false, FILE_ATTRS, vec![0x67, 0x49, 0x02, 0x00, 0x14, 0x95]),
            ],
        };
        let built = build_archive_map(&mut archive).unwrap();
        assert_eq!(built.digests.identifiers().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(built.excluded.len(), 2);
        assert_eq!(built.excluded[0].path, "a");
        assert_eq!(built.excluded[0].reason, None);
        assert_eq!(built.excluded[1].path, "c");
        assert_eq!(
            built.excluded[1].reason.map(|m| m.kind),
            Some(MalformedKind::DigestLength(0))
        );
        assert!(built.excluded[1].to_string().starts_with("c: at offset 0"));
    }

    #[test]
    fn symlink_payload_becomes_target() {
        let (entry, _) = mem_entry("SYSTEM/bin/sh", false, LINK_ATTRS, Vec::new());
        let mut archive = MemoryArchive {
            entries: vec![(entry, b"mksh".to_vec())],
        };
        let built = build_archive_map(&mut archive).unwrap();
        assert_eq!(
            built.digests.get("SYSTEM/bin/sh"),
            Some(&DigestRecord::SymlinkTarget(b"mksh".to_vec()))
        );
    }

    fn write_fixture() -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        writer
            .add_directory("IMAGES/", SimpleFileOptions::default())
            .unwrap();

        let mut options = FileOptions::<ExtendedFileOptions>::default();
        options
            .add_extra_data(DIGEST_HEADER_ID, digest_payload([0xaa; 32]).into_boxed_slice(), false)
            .unwrap();
        writer.start_file("IMAGES/boot.img", options).unwrap();
        writer.write_all(b"boot image").unwrap();

        writer
            .start_file("META/misc_info.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"no digest here").unwrap();

        writer
            .add_symlink("SYSTEM/bin/sh", "mksh", SimpleFileOptions::default())
            .unwrap();

        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_real_zip() {
        let bytes = write_fixture();
        let mut source = ZipSource::new(Cursor::new(bytes), "fixture.zip").unwrap();
        let built = build_archive_map(&mut source).unwrap();

        assert_eq!(
            built.digests.get("IMAGES/boot.img"),
            Some(&DigestRecord::Digest(ContentDigest::new([0xaa; 32])))
        );
        assert_eq!(
            built.digests.get("SYSTEM/bin/sh"),
            Some(&DigestRecord::SymlinkTarget(b"mksh".to_vec()))
        );
        assert!(!built.digests.contains("IMAGES/"));
        assert!(!built.digests.contains("META/misc_info.txt"));
        assert_eq!(built.excluded.len(), 1);
        assert_eq!(built.excluded[0].path, "META/misc_info.txt");
    }

    #[test]
    fn read_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&write_fixture()).unwrap();
        tmp.flush().unwrap();
        let built = read_archive_digests(tmp.path()).unwrap();
        assert_eq!(built.digests.len(), 2);
    }

    #[test]
    fn not_a_zip_is_an_archive_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"definitely not a zip").unwrap();
        tmp.flush().unwrap();
        let err = read_archive_digests(tmp.path()).unwrap_err();
        assert!(matches!(err, ParityError::Archive { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_archive_digests(Path::new("/nonexistent/target_files.zip")).unwrap_err();
        assert!(matches!(err, ParityError::Io { .. }));
    }
}
