//! Zip fixtures for unit tests.

use std::io::Write;
use std::path::Path;

use parity_core::extra::{DIGEST_HEADER_ID, DIGEST_SIGNATURE};
use zip::write::{ExtendedFileOptions, FileOptions, SimpleFileOptions};
use zip::ZipWriter;

/// One archive entry to write.
pub enum Entry<'a> {
    /// Regular file carrying a digest block
    Digest(&'a str, [u8; 32]),
    /// Symlink to a target
    Link(&'a str, &'a str),
    /// Regular file without any extra field
    Plain(&'a str),
}

/// Write a zip archive at `path`.
pub fn write_archive(path: &Path, entries: &[Entry<'_>]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);

    for entry in entries {
        match entry {
            Entry::Digest(name, digest) => {
                let mut payload = DIGEST_SIGNATURE.to_le_bytes().to_vec();
                payload.extend_from_slice(digest);
                let mut options = FileOptions::<ExtendedFileOptions>::default();
                options
                    .add_extra_data(DIGEST_HEADER_ID, payload.into_boxed_slice(), false)
                    .unwrap();
                writer.start_file(*name, options).unwrap();
                writer.write_all(name.as_bytes()).unwrap();
            }
            Entry::Link(name, target) => {
                writer
                    .add_symlink(*name, *target, SimpleFileOptions::default())
                    .unwrap();
            }
            Entry::Plain(name) => {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(b"plain").unwrap();
            }
        }
    }

    writer.finish().unwrap();
}
