//! The pull -> write -> hash -> observe cycle and terminal transitions.
//!
//! Runs on a dedicated task per download. Writes are strictly ordered by
//! stream sequence; the next chunk is not pulled until the in-flight write
//! completed, which is the backpressure point protecting memory from
//! unwritten chunks. The loop always reaches a terminal state and the
//! observer channel always carries exactly one terminal event.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::WriterConfig;
use crate::control::CancelToken;
use crate::diag::DiagnosticHandle;
use crate::error::{DiskError, InterruptReason};
use crate::hasher::HashAccumulator;
use crate::progress::{ObserverEvent, ProgressCell, ProgressReporter};
use crate::save_info::SaveInfo;
use crate::storage::FileWriter;
use crate::stream::{ByteStream, StreamPayload};

use super::state::WriterState;
use super::TerminalStatus;

pub(super) async fn run(
    save_info: SaveInfo,
    target: PathBuf,
    mut stream: ByteStream,
    mut reporter: ProgressReporter,
    observer_task: JoinHandle<()>,
    cancel: CancelToken,
    cell: Arc<ProgressCell>,
    state: watch::Sender<WriterState>,
    diag: DiagnosticHandle,
    config: WriterConfig,
) -> TerminalStatus {
    tracing::debug!(
        diag = %diag,
        target = %target.display(),
        offset = save_info.offset,
        "opening download file"
    );

    let (mut file, mut hash) = match setup(&save_info, &target).await {
        Ok(pair) => pair,
        Err(e) => {
            // Open failed: straight from Initializing to Interrupted. There
            // is no temp file to hand over here.
            tracing::warn!(diag = %diag, error = %e, "download file open failed");
            return interrupt(
                None,
                reporter,
                observer_task,
                &state,
                &cancel,
                e.reason(),
                0,
                &diag,
            )
            .await;
        }
    };

    state.send_replace(WriterState::Streaming);
    loop {
        // Pull boundary: a cancel request wakes the wait for the next chunk.
        let payload = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return cancelled(Some(file), reporter, observer_task, &state, &diag).await;
            }
            payload = stream.next() => payload,
        };

        match payload {
            StreamPayload::Data(chunk) => {
                // Write boundary: last cancel check before committing bytes.
                if cancel.is_cancelled() {
                    return cancelled(Some(file), reporter, observer_task, &state, &diag).await;
                }
                cell.received
                    .fetch_add(chunk.bytes.len() as u64, Ordering::Relaxed);
                if let Err(e) = file.write(&chunk.bytes).await {
                    tracing::warn!(
                        diag = %diag,
                        sequence = chunk.sequence,
                        error = %e,
                        "disk write failed"
                    );
                    let written = flushed_bytes(&mut file, &diag).await;
                    return interrupt(
                        Some(file),
                        reporter,
                        observer_task,
                        &state,
                        &cancel,
                        e.reason(),
                        written,
                        &diag,
                    )
                    .await;
                }
                // Hash only after the write confirmed, in write order.
                hash.update(&chunk.bytes);
                cell.written
                    .fetch_add(chunk.bytes.len() as u64, Ordering::Relaxed);
                reporter.observe();
            }
            StreamPayload::Eof => break,
            StreamPayload::Err(e) => {
                tracing::warn!(diag = %diag, error = %e, "byte stream failed");
                let written = flushed_bytes(&mut file, &diag).await;
                return interrupt(
                    Some(file),
                    reporter,
                    observer_task,
                    &state,
                    &cancel,
                    InterruptReason::Network,
                    written,
                    &diag,
                )
                .await;
            }
        }
    }

    state.send_replace(WriterState::Completing);
    let bytes = file.position();
    let written = file.bytes_written();
    match file.finalize(save_info.overwrite, config.sync_on_finalize).await {
        Ok(path) => {
            let digest = hash.finalize();
            tracing::info!(
                diag = %diag,
                path = %path.display(),
                bytes,
                digest = %digest,
                "download completed"
            );
            reporter
                .finish(ObserverEvent::Completed {
                    path: path.clone(),
                    digest: digest.clone(),
                    bytes,
                })
                .await;
            let _ = observer_task.await;
            state.send_replace(WriterState::Completed);
            TerminalStatus::Completed {
                path,
                digest,
                bytes,
            }
        }
        Err(e) => {
            tracing::warn!(diag = %diag, error = %e, "finalize failed");
            interrupt(
                None,
                reporter,
                observer_task,
                &state,
                &cancel,
                e.reason(),
                written,
                &diag,
            )
            .await
        }
    }
}

/// Open the disk writer and seed the hash accumulator. On resume the temp
/// file's prefix is rehashed; a caller-supplied prefix digest that does not
/// match means the on-disk content is not what the attempt was built for.
async fn setup(
    save_info: &SaveInfo,
    target: &Path,
) -> Result<(FileWriter, HashAccumulator), DiskError> {
    let file = FileWriter::open(target, save_info.offset, save_info.max_bytes).await?;
    if save_info.offset == 0 {
        return Ok((file, HashAccumulator::new()));
    }

    let hash = HashAccumulator::from_file_prefix(file.temp_path(), save_info.offset).await?;
    if let Some(expected) = &save_info.prefix_digest {
        if !hash.current_digest().eq_ignore_ascii_case(expected) {
            return Err(DiskError::PrefixMismatch {
                path: file.temp_path().to_path_buf(),
            });
        }
    }
    Ok((file, hash))
}

/// Flush pending bytes after a failure so the reported count matches what
/// actually landed on disk. A failing flush leaves that count unknowable, so
/// it is clamped to zero and the next attempt starts over.
async fn flushed_bytes(file: &mut FileWriter, diag: &DiagnosticHandle) -> u64 {
    match file.flush().await {
        Ok(()) => file.bytes_written(),
        Err(e) => {
            tracing::warn!(diag = %diag, error = %e, "flush of partial data failed");
            0
        }
    }
}

/// Interruption path: partial file stays in place for a later resume. A
/// cancel request that lands before the terminal event is delivered still
/// wins: the attempt diverts to the cancel path and is abandoned instead.
async fn interrupt(
    file: Option<FileWriter>,
    reporter: ProgressReporter,
    observer_task: JoinHandle<()>,
    state: &watch::Sender<WriterState>,
    cancel: &CancelToken,
    reason: InterruptReason,
    bytes_written: u64,
    diag: &DiagnosticHandle,
) -> TerminalStatus {
    state.send_replace(WriterState::Interrupting);
    tracing::info!(diag = %diag, %reason, bytes_written, "download interrupted");
    let mut divert = cancel.is_cancelled();
    if !divert {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => divert = true,
            _ = reporter.send_terminal(ObserverEvent::Interrupted {
                reason,
                bytes_written,
            }) => {}
        }
    }
    if divert {
        return cancelled(file, reporter, observer_task, state, diag).await;
    }
    drop(reporter);
    let _ = observer_task.await;
    state.send_replace(WriterState::Interrupted);
    TerminalStatus::Interrupted {
        reason,
        bytes_written,
    }
}

/// Cancel path: the attempt is abandoned outright, so the temp file goes
/// too, and the terminal callback reports zero bytes remaining.
async fn cancelled(
    file: Option<FileWriter>,
    reporter: ProgressReporter,
    observer_task: JoinHandle<()>,
    state: &watch::Sender<WriterState>,
    diag: &DiagnosticHandle,
) -> TerminalStatus {
    state.send_replace(WriterState::Cancelled);
    if let Some(file) = file {
        if let Err(e) = file.discard().await {
            tracing::warn!(diag = %diag, error = %e, "temp file removal failed");
        }
    }
    tracing::info!(diag = %diag, "download cancelled");
    reporter
        .finish(ObserverEvent::Interrupted {
            reason: InterruptReason::UserCancelled,
            bytes_written: 0,
        })
        .await;
    let _ = observer_task.await;
    TerminalStatus::Cancelled
}
