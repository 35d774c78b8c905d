//! Disk I/O and temp-file lifecycle for a single download.
//!
//! Data lands in a temp file (final name plus `.part`) and is renamed to
//! its final name only after a successful flush. Writes are strictly
//! sequential; resume seeks to the caller-supplied offset before the first
//! write and trims anything past it. Partial data is never deleted on a
//! write failure; cleanup is the controller's call via `discard`.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::error::{classify_io, DiskError};

/// Temporary file suffix used before the finalize rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path
/// (e.g. `file.iso` -> `file.iso.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Writer for one download's temp file.
#[derive(Debug)]
pub struct FileWriter {
    file: File,
    temp_path: PathBuf,
    final_path: PathBuf,
    offset: u64,
    bytes_written: u64,
    max_bytes: Option<u64>,
}

impl FileWriter {
    /// Open the temp file for `final_path`. A zero `offset` starts fresh
    /// (truncating any stale temp file); a nonzero one resumes, keeping the
    /// first `offset` bytes and dropping any stale tail. Whether those bytes
    /// match the original content is the caller's responsibility; the writer
    /// does not verify it here.
    pub async fn open(
        final_path: &Path,
        offset: u64,
        max_bytes: Option<u64>,
    ) -> Result<FileWriter, DiskError> {
        let temp = temp_path(final_path);
        let mut options = OpenOptions::new();
        options.create(true).read(true).write(true);
        if offset == 0 {
            options.truncate(true);
        }
        let mut file = options
            .open(&temp)
            .await
            .map_err(|e| classify_io(&temp, e))?;

        if offset > 0 {
            let meta = file.metadata().await.map_err(|e| classify_io(&temp, e))?;
            if meta.len() < offset {
                return Err(DiskError::Io {
                    path: temp,
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("temp file holds {} bytes, resume offset is {}", meta.len(), offset),
                    ),
                });
            }
            file.set_len(offset).await.map_err(|e| classify_io(&temp, e))?;
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| classify_io(&temp, e))?;
        }

        Ok(FileWriter {
            file,
            temp_path: temp,
            final_path: final_path.to_path_buf(),
            offset,
            bytes_written: 0,
            max_bytes,
        })
    }

    /// Append `bytes` at the current position. Fails without writing when
    /// the configured byte cap would be exceeded.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), DiskError> {
        if let Some(limit) = self.max_bytes {
            if self.position() + bytes.len() as u64 > limit {
                return Err(DiskError::TooLarge {
                    path: self.temp_path.clone(),
                    limit,
                });
            }
        }
        self.file
            .write_all(bytes)
            .await
            .map_err(|e| classify_io(&self.temp_path, e))?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Flush buffered writes to the file.
    pub async fn flush(&mut self) -> Result<(), DiskError> {
        self.file
            .flush()
            .await
            .map_err(|e| classify_io(&self.temp_path, e))
    }

    /// Bytes present in the file: resume offset plus this attempt's writes.
    pub fn position(&self) -> u64 {
        self.offset + self.bytes_written
    }

    /// Bytes written by this attempt alone.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Path of the temp file backing this writer.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush, optionally sync, and rename the temp file to its final name.
    /// When `overwrite` is off and the final path is already taken, fails
    /// with `TargetExists` and leaves the temp file in place.
    pub async fn finalize(mut self, overwrite: bool, sync: bool) -> Result<PathBuf, DiskError> {
        self.file
            .flush()
            .await
            .map_err(|e| classify_io(&self.temp_path, e))?;
        if sync {
            self.file
                .sync_all()
                .await
                .map_err(|e| classify_io(&self.temp_path, e))?;
        }
        if !overwrite {
            let taken = fs::try_exists(&self.final_path)
                .await
                .map_err(|e| classify_io(&self.final_path, e))?;
            if taken {
                return Err(DiskError::TargetExists {
                    path: self.final_path,
                });
            }
        }
        // Close before rename; some platforms refuse to move an open file.
        drop(self.file);
        fs::rename(&self.temp_path, &self.final_path)
            .await
            .map_err(|e| classify_io(&self.temp_path, e))?;
        Ok(self.final_path)
    }

    /// Close the handle and delete the temp file (the cancel path).
    pub async fn discard(self) -> Result<(), DiskError> {
        drop(self.file);
        fs::remove_file(&self.temp_path)
            .await
            .map_err(|e| classify_io(&self.temp_path, e))
    }
}
