//! Integrity comparator
//!
//! Checksum and timestamp comparisons between a local file and the stat of
//! a remote object.

use std::path::Path;

use jiff::Timestamp;
use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};
use crate::metadata::{PosixMetadata, whole_seconds};
use crate::traits::ObjectInfo;

/// Read size used when hashing local files
pub const HASH_BLOCK_SIZE: usize = 64 * 1024;

/// MD5 of a local file, streamed in fixed-size blocks
pub async fn local_md5(path: &Path) -> Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| missing_or_io(path, e))?;

    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize().to_vec())
}

/// Modification time of a local file truncated to whole seconds (UTC)
pub async fn local_mtime(path: &Path) -> Result<Timestamp> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| missing_or_io(path, e))?;
    whole_seconds(meta.modified()?)
        .ok_or_else(|| Error::InvalidData(format!("Unrepresentable mtime: {}", path.display())))
}

/// Compare a local digest with the remote object's MD5 (raw bytes).
///
/// Objects without an MD5 (e.g. composite uploads) never match.
pub fn md5_matches(local: &[u8], remote: &ObjectInfo) -> bool {
    remote.md5.as_deref().is_some_and(|md5| md5 == local)
}

/// Compare a local mtime with the remote object's preserved POSIX mtime.
///
/// Objects uploaded without POSIX metadata never match.
pub fn mtime_matches(local: Timestamp, remote: &ObjectInfo) -> bool {
    PosixMetadata::from_metadata(&remote.metadata)
        .and_then(|posix| posix.mtime)
        .is_some_and(|mtime| mtime.as_second() == local.as_second())
}

/// Lowercase hex form of a raw digest
pub fn hex_digest(digest: &[u8]) -> String {
    hex::encode(digest)
}

fn missing_or_io(path: &Path, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::SourceMissing(path.display().to_string())
    } else {
        Error::Io(err)
    }
}
