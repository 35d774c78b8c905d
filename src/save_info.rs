//! Per-attempt save configuration and target path resolution.

use std::path::{Path, PathBuf};

/// Fallback name when the caller supplies neither a path nor a usable name.
const DEFAULT_NAME: &str = "download.bin";

/// Immutable-at-start configuration for one download attempt, owned by the
/// controller for the attempt's lifetime.
///
/// A nonzero `offset` means resume: the writer seeks there before the first
/// write and trims anything past it. That the offset matches prior on-disk
/// content is the caller's responsibility; `prefix_digest` is the only
/// check applied, and only when set.
#[derive(Debug, Clone, Default)]
pub struct SaveInfo {
    /// Forced final path; wins over directory + name resolution.
    pub file_path: Option<PathBuf>,
    /// Target directory; falls back to the default downloads directory.
    pub target_directory: Option<PathBuf>,
    /// Suggested final file name.
    pub suggested_name: Option<String>,
    /// Resume offset in bytes (0 = fresh download).
    pub offset: u64,
    /// Expected hex SHA-256 of the first `offset` bytes. Mismatch against
    /// the on-disk prefix interrupts with a target-changed reason before
    /// any new byte is written.
    pub prefix_digest: Option<String>,
    /// Hard cap on the file size; exceeding it interrupts the download.
    pub max_bytes: Option<u64>,
    /// Whether finalize may replace an existing file at the final path.
    pub overwrite: bool,
}

impl SaveInfo {
    /// Resolve the final target path against `default_dir`.
    pub fn resolve_target(&self, default_dir: &Path) -> PathBuf {
        if let Some(path) = &self.file_path {
            return path.clone();
        }
        let dir = self.target_directory.as_deref().unwrap_or(default_dir);
        let name = self
            .suggested_name
            .as_deref()
            .filter(|n| !n.is_empty() && *n != "." && *n != "..")
            .unwrap_or(DEFAULT_NAME);
        dir.join(name)
    }
}
