//! Zip extra-field decoding.
//!
//! The packager stores a SHA-256 of each entry's uncompressed content in a
//! private extra-field block:
//!
//! ```text
//! +-----------+-----------+---------------+------------------+
//! | header id | data size | signature     | digest           |
//! | 0x4967 LE | u16 LE    | 0x9514 LE     | 32 bytes         |
//! +-----------+-----------+---------------+------------------+
//! ```
//!
//! Blocks are packed back to back. Scanning stops at the first valid digest
//! block or at the end of the buffer. Trailing garbage is reported as
//! [`MalformedExtraField`], never as a digest.

use thiserror::Error;

use crate::types::{ContentDigest, DigestRecord};

/// Extra-field header id of the embedded digest block.
pub const DIGEST_HEADER_ID: u16 = 0x4967;

/// Signature that opens the payload of a digest block.
pub const DIGEST_SIGNATURE: u16 = 0x9514;

/// Size of a block header (id + size).
const BLOCK_HEADER_LEN: usize = 4;

/// Size of the payload signature.
const SIGNATURE_LEN: usize = 2;

/// POSIX file type mask and symlink type.
const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// One sub-record inside an extra field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraFieldBlock<'a> {
    /// Offset of the block header within the extra field
    pub offset: usize,
    /// Block type
    pub header_id: u16,
    /// Payload, exactly as long as the declared data size
    pub payload: &'a [u8],
}

/// Why an extra field could not be fully decoded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedKind {
    /// Fewer than 4 bytes left for a block header.
    #[error("{remaining} trailing byte(s), too short for a block header")]
    TruncatedHeader {
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// The declared data size runs past the end of the buffer.
    #[error("block declares {declared} payload byte(s) but only {available} remain")]
    TruncatedPayload {
        /// Declared data size
        declared: usize,
        /// Bytes actually available
        available: usize,
    },

    /// A signed digest block carries the wrong number of digest bytes.
    #[error("digest block carries {0} digest byte(s), expected 32")]
    DigestLength(usize),
}

/// A decoding failure and where it happened.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("at offset {offset}: {kind}")]
pub struct MalformedExtraField {
    /// Offset of the offending block header
    pub offset: usize,
    /// What was wrong
    pub kind: MalformedKind,
}

/// Cursor over the blocks of one extra field.
///
/// Yields each well-formed block, then at most one error if the buffer ends
/// mid-block. Iteration stops after the error.
#[derive(Debug, Clone)]
pub struct ExtraFieldReader<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> ExtraFieldReader<'a> {
    /// Start reading at offset 0.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            done: false,
        }
    }

    fn fail(&mut self, kind: MalformedKind) -> Option<Result<ExtraFieldBlock<'a>, MalformedExtraField>> {
        self.done = true;
        Some(Err(MalformedExtraField {
            offset: self.pos,
            kind,
        }))
    }
}

impl<'a> Iterator for ExtraFieldReader<'a> {
    type Item = Result<ExtraFieldBlock<'a>, MalformedExtraField>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rest = &self.data[self.pos..];
        if rest.is_empty() {
            self.done = true;
            return None;
        }
        if rest.len() < BLOCK_HEADER_LEN {
            return self.fail(MalformedKind::TruncatedHeader {
                remaining: rest.len(),
            });
        }

        let (header, body) = rest.split_at(BLOCK_HEADER_LEN);
        let header_id = u16::from_le_bytes([header[0], header[1]]);
        let declared = usize::from(u16::from_le_bytes([header[2], header[3]]));
        if body.len() < declared {
            return self.fail(MalformedKind::TruncatedPayload {
                declared,
                available: body.len(),
            });
        }

        let block = ExtraFieldBlock {
            offset: self.pos,
            header_id,
            payload: &body[..declared],
        };
        self.pos += BLOCK_HEADER_LEN + declared;
        Some(Ok(block))
    }
}

/// Result of searching an extra field for the embedded digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestLookup {
    /// A well-formed digest block was found
    Found(ContentDigest),
    /// The field decoded cleanly but holds no digest block
    NotFound,
    /// No digest was found and the field is damaged
    Malformed(MalformedExtraField),
}

/// Search an extra field for the embedded digest block.
///
/// The first block with the digest header id and a matching signature
/// decides the result: `Found` with exactly 32 digest bytes, `Malformed`
/// otherwise. Nothing after it is read. Digest blocks too short to hold a
/// signature, or with a foreign signature, are skipped.
#[must_use]
pub fn find_digest(extra: &[u8]) -> DigestLookup {
    for block in ExtraFieldReader::new(extra) {
        let block = match block {
            Ok(block) => block,
            Err(e) => return DigestLookup::Malformed(e),
        };
        if block.header_id != DIGEST_HEADER_ID {
            continue;
        }
        if block.payload.len() < SIGNATURE_LEN {
            continue;
        }
        let (sig, digest) = block.payload.split_at(SIGNATURE_LEN);
        if u16::from_le_bytes([sig[0], sig[1]]) != DIGEST_SIGNATURE {
            continue;
        }
        return ContentDigest::from_slice(digest).map_or(
            DigestLookup::Malformed(MalformedExtraField {
                offset: block.offset,
                kind: MalformedKind::DigestLength(digest.len()),
            }),
            DigestLookup::Found,
        );
    }

    DigestLookup::NotFound
}

/// Whether the POSIX mode in the upper half of `external_attributes` is a symlink.
#[must_use]
pub const fn is_symlink(external_attributes: u32) -> bool {
    ((external_attributes >> 16) & S_IFMT) == S_IFLNK
}

/// What an archive entry contributes to its digest map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValue {
    /// Insert this record
    Record(DigestRecord),
    /// Leave the entry out of the map
    Excluded(Option<MalformedExtraField>),
}

/// Decide the comparison value of one entry.
///
/// An embedded digest wins. Failing that, a symlink contributes its link
/// target, read lazily through `link_target`. Anything else is excluded,
/// carrying the decoding error if the field was damaged.
pub fn resolve_entry<E>(
    extra: &[u8],
    external_attributes: u32,
    link_target: impl FnOnce() -> Result<Vec<u8>, E>,
) -> Result<EntryValue, E> {
    let malformed = match find_digest(extra) {
        DigestLookup::Found(d) => return Ok(EntryValue::Record(DigestRecord::Digest(d))),
        DigestLookup::NotFound => None,
        DigestLookup::Malformed(m) => Some(m),
    };

    if is_symlink(external_attributes) {
        let target = link_target()?;
        return Ok(EntryValue::Record(DigestRecord::SymlinkTarget(target)));
    }

    Ok(EntryValue::Excluded(malformed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    const SYMLINK_ATTRS: u32 = 0o120_777 << 16;
    const FILE_ATTRS: u32 = 0o100_644 << 16;

    fn block(header_id: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&header_id.to_le_bytes());
        out.extend_from_slice(&u16::try_from(payload.len()).unwrap().to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn digest_block(digest: [u8; 32]) -> Vec<u8> {
        let mut payload = DIGEST_SIGNATURE.to_le_bytes().to_vec();
        payload.extend_from_slice(&digest);
        block(DIGEST_HEADER_ID, &payload)
    }

    fn no_link() -> Result<Vec<u8>, Infallible> {
        panic!("link target must not be read")
    }

    #[test]
    fn finds_lone_digest_block() {
        let extra = digest_block([0x11; 32]);
        assert_eq!(
            find_digest(&extra),
            DigestLookup::Found(ContentDigest::new([0x11; 32]))
        );
    }

    #[test]
    fn finds_digest_between_other_blocks() {
        let mut extra = block(0x5455, &[1, 2, 3, 4, 5]);
        extra.extend(block(0xcafe, &[]));
        extra.extend(digest_block([0x42; 32]));
        extra.extend(block(0x000a, &[9; 12]));
        assert_eq!(
            find_digest(&extra),
            DigestLookup::Found(ContentDigest::new([0x42; 32]))
        );
    }

    #[test]
    fn first_digest_block_wins() {
        let mut extra = digest_block([1; 32]);
        extra.extend(digest_block([2; 32]));
        assert_eq!(
            find_digest(&extra),
            DigestLookup::Found(ContentDigest::new([1; 32]))
        );
    }

    #[test]
    fn stops_scanning_after_match() {
        // garbage after the digest block is never looked at
        let mut extra = digest_block([3; 32]);
        extra.extend_from_slice(&[0xff, 0xff, 0xff]);
        assert_eq!(
            find_digest(&extra),
            DigestLookup::Found(ContentDigest::new([3; 32]))
        );
    }

    #[test]
    fn short_signed_block_ends_the_search() {
        let mut short = DIGEST_SIGNATURE.to_le_bytes().to_vec();
        short.extend_from_slice(&[0xaa; 16]);
        let mut extra = block(DIGEST_HEADER_ID, &short);
        extra.extend(digest_block([0xbb; 32]));

        assert_eq!(
            find_digest(&extra),
            DigestLookup::Malformed(MalformedExtraField {
                offset: 0,
                kind: MalformedKind::DigestLength(16),
            })
        );
    }

    #[test]
    fn parsing_is_idempotent() {
        let mut extra = block(0x7875, &[1, 4, 0, 0, 0, 0]);
        extra.extend(digest_block([9; 32]));
        assert_eq!(find_digest(&extra), find_digest(&extra));
    }

    #[test]
    fn empty_field_is_not_found() {
        assert_eq!(find_digest(&[]), DigestLookup::NotFound);
    }

    #[test]
    fn zero_size_digest_block_is_skipped() {
        let mut extra = block(DIGEST_HEADER_ID, &[]);
        extra.extend(digest_block([5; 32]));
        assert_eq!(
            find_digest(&extra),
            DigestLookup::Found(ContentDigest::new([5; 32]))
        );
        assert_eq!(find_digest(&block(DIGEST_HEADER_ID, &[])), DigestLookup::NotFound);
    }

    #[test]
    fn foreign_signature_is_skipped() {
        let mut payload = 0x1234u16.to_le_bytes().to_vec();
        payload.extend_from_slice(&[0; 32]);
        assert_eq!(find_digest(&block(DIGEST_HEADER_ID, &payload)), DigestLookup::NotFound);
    }

    #[test]
    fn signature_without_digest_is_malformed() {
        let extra = [0x67, 0x49, 0x02, 0x00, 0x14, 0x95];
        assert_eq!(
            find_digest(&extra),
            DigestLookup::Malformed(MalformedExtraField {
                offset: 0,
                kind: MalformedKind::DigestLength(0),
            })
        );
    }

    #[test]
    fn truncated_header_is_malformed() {
        let mut extra = block(0x0001, &[0; 4]);
        extra.extend_from_slice(&[0x67, 0x49]);
        assert_eq!(
            find_digest(&extra),
            DigestLookup::Malformed(MalformedExtraField {
                offset: 8,
                kind: MalformedKind::TruncatedHeader { remaining: 2 },
            })
        );
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let mut extra = digest_block([1; 32]);
        extra.truncate(20);
        assert_eq!(
            find_digest(&extra),
            DigestLookup::Malformed(MalformedExtraField {
                offset: 0,
                kind: MalformedKind::TruncatedPayload {
                    declared: 34,
                    available: 16,
                },
            })
        );
    }

    #[test]
    fn reader_yields_blocks_then_error() {
        let mut extra = block(0x1111, &[1]);
        extra.extend(block(0x2222, &[2, 2]));
        extra.push(0x33);
        let items: Vec<_> = ExtraFieldReader::new(&extra).collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].unwrap().header_id, 0x1111);
        assert_eq!(items[1].unwrap().payload, &[2, 2]);
        assert_eq!(items[1].unwrap().offset, 5);
        assert!(items[2].is_err());
    }

    #[test]
    fn symlink_mode_detection() {
        assert!(is_symlink(SYMLINK_ATTRS));
        assert!(!is_symlink(FILE_ATTRS));
        assert!(!is_symlink(0));
        // directory bits share a prefix with symlink bits
        assert!(!is_symlink(0o040_755 << 16));
    }

    #[test]
    fn digest_beats_symlink_target() {
        let extra = digest_block([8; 32]);
        let value = resolve_entry(&extra, SYMLINK_ATTRS, no_link).unwrap();
        assert_eq!(
            value,
            EntryValue::Record(DigestRecord::Digest(ContentDigest::new([8; 32])))
        );
    }

    #[test]
    fn symlink_without_digest_uses_target() {
        let value =
            resolve_entry(&[], SYMLINK_ATTRS, || Ok::<_, Infallible>(b"/system/bin/sh".to_vec()))
                .unwrap();
        assert_eq!(
            value,
            EntryValue::Record(DigestRecord::SymlinkTarget(b"/system/bin/sh".to_vec()))
        );
    }

    #[test]
    fn plain_file_without_digest_is_excluded() {
        assert_eq!(
            resolve_entry(&[], FILE_ATTRS, no_link).unwrap(),
            EntryValue::Excluded(None)
        );
    }

    #[test]
    fn malformed_file_is_excluded_with_reason() {
        let extra = [0x67, 0x49, 0x02, 0x00, 0x14, 0x95];
        match resolve_entry(&extra, FILE_ATTRS, no_link).unwrap() {
            EntryValue::Excluded(Some(m)) => assert_eq!(m.kind, MalformedKind::DigestLength(0)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn link_read_errors_propagate() {
        let result = resolve_entry(&[], SYMLINK_ATTRS, || Err::<Vec<u8>, _>("boom"));
        assert_eq!(result, Err("boom"));
    }
}
