//! Shared test support: an observer that records everything it sees.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dlsink::error::InterruptReason;
use dlsink::observer::DownloadObserver;
use dlsink::progress::ProgressSnapshot;

/// Terminal callback as recorded from the observer side.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Completed {
        path: PathBuf,
        digest: String,
        bytes: u64,
    },
    Interrupted {
        reason: InterruptReason,
        bytes_written: u64,
    },
}

#[derive(Default)]
pub struct RecordingObserver {
    pub progress: Mutex<Vec<ProgressSnapshot>>,
    pub terminals: Mutex<Vec<Terminal>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<RecordingObserver> {
        Arc::new(RecordingObserver::default())
    }

    pub fn terminals(&self) -> Vec<Terminal> {
        self.terminals.lock().unwrap().clone()
    }

    pub fn progress_count(&self) -> usize {
        self.progress.lock().unwrap().len()
    }
}

impl DownloadObserver for RecordingObserver {
    fn on_progress(&self, snapshot: ProgressSnapshot) {
        self.progress.lock().unwrap().push(snapshot);
    }

    fn on_completed(&self, path: &Path, digest: &str, bytes: u64) {
        self.terminals.lock().unwrap().push(Terminal::Completed {
            path: path.to_path_buf(),
            digest: digest.to_string(),
            bytes,
        });
    }

    fn on_interrupted(&self, reason: InterruptReason, bytes_written: u64) {
        self.terminals.lock().unwrap().push(Terminal::Interrupted {
            reason,
            bytes_written,
        });
    }
}
