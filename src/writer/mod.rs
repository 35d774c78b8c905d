//! Download file controller.
//!
//! `DownloadFile::create` is the factory: it takes ownership of the save
//! configuration, the byte stream, and the diagnostic handle, holds the
//! observer weakly, and starts the write loop on its own task. The handle
//! left behind exposes cancel and progress/state queries; the observer gets
//! exactly one terminal callback per attempt.

mod run;
mod state;

pub use state::WriterState;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::WriterConfig;
use crate::control::CancelToken;
use crate::diag::DiagnosticHandle;
use crate::error::InterruptReason;
use crate::observer::DownloadObserver;
use crate::progress::{run_observer_loop, ProgressCell, ProgressReporter, ProgressSnapshot};
use crate::save_info::SaveInfo;
use crate::stream::ByteStream;

/// Terminal result of a download attempt.
#[derive(Debug, Clone)]
pub enum TerminalStatus {
    Completed {
        path: PathBuf,
        digest: String,
        bytes: u64,
    },
    Interrupted {
        reason: InterruptReason,
        bytes_written: u64,
    },
    Cancelled,
}

/// Handle to an in-progress download.
pub struct DownloadFile {
    cancel: CancelToken,
    cell: Arc<ProgressCell>,
    state: watch::Receiver<WriterState>,
    task: JoinHandle<TerminalStatus>,
}

impl DownloadFile {
    /// Create the writer for one attempt and start it immediately.
    ///
    /// The target path is resolved from `save_info` against `default_dir`.
    /// File I/O runs only on the spawned task, never on the caller's.
    pub fn create(
        save_info: SaveInfo,
        default_dir: &Path,
        stream: ByteStream,
        diag: DiagnosticHandle,
        observer: Weak<dyn DownloadObserver>,
    ) -> DownloadFile {
        Self::create_with_config(
            save_info,
            default_dir,
            stream,
            diag,
            observer,
            WriterConfig::default(),
        )
    }

    pub fn create_with_config(
        save_info: SaveInfo,
        default_dir: &Path,
        stream: ByteStream,
        diag: DiagnosticHandle,
        observer: Weak<dyn DownloadObserver>,
        config: WriterConfig,
    ) -> DownloadFile {
        let cancel = CancelToken::new();
        let cell = Arc::new(ProgressCell::new());
        let (state_tx, state_rx) = watch::channel(WriterState::Initializing);
        let (reporter, events) = ProgressReporter::new(
            Arc::clone(&cell),
            config.progress_interval(),
            config.observer_channel_capacity,
        );
        let observer_task = tokio::spawn(run_observer_loop(events, observer));

        let target = save_info.resolve_target(default_dir);
        let task = tokio::spawn(run::run(
            save_info,
            target,
            stream,
            reporter,
            observer_task,
            cancel.clone(),
            Arc::clone(&cell),
            state_tx,
            diag,
            config,
        ));

        DownloadFile {
            cancel,
            cell,
            state: state_rx,
            task,
        }
    }

    /// Request cancellation. Observed at the next pull/write boundary, or
    /// while an interruption's terminal event is still undelivered; the
    /// temp file is removed and the attempt ends in `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Snapshot of this download's progress so far.
    pub fn current_progress(&self) -> ProgressSnapshot {
        self.cell.snapshot()
    }

    /// Current state of the write loop.
    pub fn state(&self) -> WriterState {
        *self.state.borrow()
    }

    /// Wait for the attempt to reach its terminal state. The terminal
    /// observer callback has been delivered by the time this returns.
    pub async fn wait(self) -> TerminalStatus {
        self.task.await.unwrap_or(TerminalStatus::Interrupted {
            reason: InterruptReason::DiskFailed,
            bytes_written: 0,
        })
    }
}
