//! Observer surface for download progress and outcomes.

use std::path::Path;

use crate::error::InterruptReason;
use crate::progress::ProgressSnapshot;

/// Receives progress updates and the single terminal notification for one
/// download attempt.
///
/// The writer holds the observer weakly: if it is dropped mid-download
/// (e.g. the view it backed went away), delivery quietly becomes a no-op.
/// Exactly one of `on_completed` / `on_interrupted` fires per attempt.
pub trait DownloadObserver: Send + Sync {
    /// Rate-limited progress update. May be coalesced or dropped under
    /// pressure; never fires after the terminal callback.
    fn on_progress(&self, snapshot: ProgressSnapshot);

    /// The file was flushed, renamed to `path`, and `bytes` long; `digest`
    /// is the lowercase hex SHA-256 of its contents.
    fn on_completed(&self, path: &Path, digest: &str, bytes: u64);

    /// The attempt ended without a final file. `bytes_written` is what this
    /// attempt put on disk, enough to judge whether a resume is worthwhile.
    fn on_interrupted(&self, reason: InterruptReason, bytes_written: u64);
}
