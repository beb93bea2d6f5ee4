//! Streaming SHA-256 hashing via `ring::digest`.

use ring::digest::{Context, SHA256};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::{ParityError, Result};
use crate::types::{ContentDigest, DIGEST_LEN};

/// Buffer size for streaming file reads (1 MiB; images run to gigabytes).
const BUF_SIZE: usize = 1024 * 1024;

/// Compute SHA-256 of a file, streaming to avoid loading it all into memory.
///
/// # Errors
///
/// Returns `ParityError::Io` if the file cannot be opened or read.
pub async fn sha256_file(path: &Path) -> Result<ContentDigest> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ParityError::io(path, e))?;

    let mut context = Context::new(&SHA256);
    let mut buf = vec![0u8; BUF_SIZE];

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| ParityError::io(path, e))?;
        if n == 0 {
            break;
        }
        context.update(&buf[..n]);
    }

    Ok(to_content_digest(&context.finish()))
}

/// Compute SHA-256 of raw bytes.
#[must_use]
pub fn sha256_bytes(data: &[u8]) -> ContentDigest {
    to_content_digest(&ring::digest::digest(&SHA256, data))
}

fn to_content_digest(digest: &ring::digest::Digest) -> ContentDigest {
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(digest.as_ref());
    ContentDigest::new(out)
}
