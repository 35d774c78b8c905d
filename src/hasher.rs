//! Running content digest over written bytes.
//!
//! The accumulator is fed in durable write order, driven by the disk
//! writer's confirmation rather than stream arrival, so its state always
//! matches the bytes on disk. Resume rebuilds it by rehashing the temp
//! file's prefix: sha2 has no mid-stream state import, so "seed from a
//! partial digest" falls back to a full restart over the flushed bytes.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{classify_io, DiskError};

const BUF_SIZE: usize = 64 * 1024;

/// Incremental SHA-256 over the bytes confirmed written.
#[derive(Debug)]
pub struct HashAccumulator {
    hasher: Sha256,
    hashed: u64,
}

impl HashAccumulator {
    pub fn new() -> HashAccumulator {
        HashAccumulator {
            hasher: Sha256::new(),
            hashed: 0,
        }
    }

    /// Rebuild an accumulator from the first `offset` bytes of `path`
    /// (resume seeding). Fails if the file holds fewer bytes than that.
    pub async fn from_file_prefix(path: &Path, offset: u64) -> Result<HashAccumulator, DiskError> {
        let mut file = File::open(path).await.map_err(|e| classify_io(path, e))?;
        let mut acc = HashAccumulator::new();
        let mut buf = [0u8; BUF_SIZE];
        let mut remaining = offset;
        while remaining > 0 {
            let want = remaining.min(BUF_SIZE as u64) as usize;
            let n = file
                .read(&mut buf[..want])
                .await
                .map_err(|e| classify_io(path, e))?;
            if n == 0 {
                return Err(DiskError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("file ended {} bytes short of the resume offset", remaining),
                    ),
                });
            }
            acc.update(&buf[..n]);
            remaining -= n as u64;
        }
        Ok(acc)
    }

    /// Fold `bytes` into the running digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.hashed += bytes.len() as u64;
    }

    /// Bytes folded in so far.
    pub fn hashed_bytes(&self) -> u64 {
        self.hashed
    }

    /// Digest over the bytes seen so far, without ending accumulation.
    /// Used to validate a resumed prefix before new bytes arrive.
    pub fn current_digest(&self) -> String {
        hex::encode(self.hasher.clone().finalize())
    }

    /// Finish and return the digest as lowercase hex.
    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl Default for HashAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute SHA-256 of a whole file as lowercase hex. Off the write path;
/// used by downstream verifiers and the test suite.
pub async fn sha256_path(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_digest() {
        let acc = HashAccumulator::new();
        assert_eq!(
            acc.finalize(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn known_content_digest() {
        let mut acc = HashAccumulator::new();
        acc.update(b"hello\n");
        assert_eq!(acc.hashed_bytes(), 6);
        assert_eq!(
            acc.finalize(),
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }

    #[test]
    fn split_updates_equal_single_update() {
        let mut split = HashAccumulator::new();
        split.update(b"AB");
        split.update(b"CD");
        split.update(b"EF");
        let mut whole = HashAccumulator::new();
        whole.update(b"ABCDEF");
        assert_eq!(split.finalize(), whole.finalize());
    }

    #[test]
    fn current_digest_does_not_disturb_accumulation() {
        let mut acc = HashAccumulator::new();
        acc.update(b"AB");
        let mid = acc.current_digest();
        acc.update(b"CD");
        let mut fresh = HashAccumulator::new();
        fresh.update(b"AB");
        assert_eq!(mid, fresh.current_digest());
        fresh.update(b"CD");
        assert_eq!(acc.finalize(), fresh.finalize());
    }

    #[tokio::test]
    async fn prefix_rehash_matches_direct_hash() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"abcdef").unwrap();
        f.flush().unwrap();

        let acc = HashAccumulator::from_file_prefix(f.path(), 3).await.unwrap();
        assert_eq!(acc.hashed_bytes(), 3);
        let mut direct = HashAccumulator::new();
        direct.update(b"abc");
        assert_eq!(acc.finalize(), direct.finalize());
    }

    #[tokio::test]
    async fn prefix_rehash_fails_on_short_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"ab").unwrap();
        f.flush().unwrap();

        let err = HashAccumulator::from_file_prefix(f.path(), 10).await.unwrap_err();
        assert!(matches!(err, DiskError::Io { .. }));
    }

    #[tokio::test]
    async fn sha256_path_known_content() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello\n").unwrap();
        f.flush().unwrap();
        let digest = sha256_path(f.path()).await.unwrap();
        assert_eq!(
            digest,
            "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03"
        );
    }
}
