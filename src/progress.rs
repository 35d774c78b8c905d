//! Progress reporting: snapshots, rate limiting, and observer delivery.
//!
//! Progress events go through a bounded channel with `try_send`: a slow
//! observer coalesces or drops intermediate updates instead of stalling the
//! write loop. Terminal events are sent with `send().await` and are never
//! dropped.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::error::InterruptReason;
use crate::observer::DownloadObserver;

/// Snapshot of one download's progress, immutable once emitted.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// Bytes pulled from the stream so far.
    pub bytes_received: u64,
    /// Bytes confirmed written to the temp file by this attempt.
    pub bytes_written: u64,
    /// Seconds since the attempt started.
    pub elapsed_secs: f64,
    /// When the snapshot was taken.
    pub captured_at: Instant,
}

impl ProgressSnapshot {
    /// Write rate in bytes per second (0 if no time has elapsed).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_written as f64 / self.elapsed_secs
    }
}

/// Shared counters behind `current_progress`. The write loop bumps them;
/// the download handle snapshots them on demand.
pub(crate) struct ProgressCell {
    pub(crate) received: AtomicU64,
    pub(crate) written: AtomicU64,
    started: Instant,
}

impl ProgressCell {
    pub(crate) fn new() -> ProgressCell {
        ProgressCell {
            received: AtomicU64::new(0),
            written: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub(crate) fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            bytes_received: self.received.load(Ordering::Relaxed),
            bytes_written: self.written.load(Ordering::Relaxed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            captured_at: Instant::now(),
        }
    }
}

/// Event delivered to the observer task.
pub(crate) enum ObserverEvent {
    Progress(ProgressSnapshot),
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

/// Rate-limits progress emissions and forwards events to the observer task.
pub(crate) struct ProgressReporter {
    tx: mpsc::Sender<ObserverEvent>,
    cell: Arc<ProgressCell>,
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl ProgressReporter {
    pub(crate) fn new(
        cell: Arc<ProgressCell>,
        min_interval: Duration,
        capacity: usize,
    ) -> (ProgressReporter, mpsc::Receiver<ObserverEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            ProgressReporter {
                tx,
                cell,
                min_interval,
                last_emit: None,
            },
            rx,
        )
    }

    /// Consider emitting a progress update. Skipped inside the minimum
    /// interval or when the channel is full; the write loop never waits.
    pub(crate) fn observe(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_emit {
            if now.duration_since(last) < self.min_interval {
                return;
            }
        }
        if self
            .tx
            .try_send(ObserverEvent::Progress(self.cell.snapshot()))
            .is_ok()
        {
            self.last_emit = Some(now);
        }
    }

    /// Deliver a terminal event without consuming the reporter. Awaits
    /// channel space so the event cannot be dropped. Used where delivery
    /// must race a late cancel request; callers emit at most one terminal.
    pub(crate) async fn send_terminal(&self, event: ObserverEvent) {
        let _ = self.tx.send(event).await;
    }

    /// Deliver the terminal event and consume the reporter so nothing
    /// follows it.
    pub(crate) async fn finish(self, event: ObserverEvent) {
        self.send_terminal(event).await;
    }
}

/// Delivery loop, spawned once per download. Upgrades the weak observer per
/// event; a defunct observer turns delivery into a no-op.
pub(crate) async fn run_observer_loop(
    mut rx: mpsc::Receiver<ObserverEvent>,
    observer: Weak<dyn DownloadObserver>,
) {
    while let Some(event) = rx.recv().await {
        let Some(observer) = observer.upgrade() else {
            continue;
        };
        match event {
            ObserverEvent::Progress(snapshot) => observer.on_progress(snapshot),
            ObserverEvent::Completed {
                path,
                digest,
                bytes,
            } => observer.on_completed(&path, &digest, bytes),
            ObserverEvent::Interrupted {
                reason,
                bytes_written,
            } => observer.on_interrupted(reason, bytes_written),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_zero_without_elapsed_time() {
        let snapshot = ProgressSnapshot {
            bytes_received: 10,
            bytes_written: 10,
            elapsed_secs: 0.0,
            captured_at: Instant::now(),
        };
        assert_eq!(snapshot.bytes_per_sec(), 0.0);
    }

    #[test]
    fn rate_uses_written_bytes() {
        let snapshot = ProgressSnapshot {
            bytes_received: 4096,
            bytes_written: 2048,
            elapsed_secs: 2.0,
            captured_at: Instant::now(),
        };
        assert_eq!(snapshot.bytes_per_sec(), 1024.0);
    }

    #[tokio::test]
    async fn observe_is_rate_limited() {
        let cell = Arc::new(ProgressCell::new());
        let (mut reporter, mut rx) =
            ProgressReporter::new(cell, Duration::from_secs(3600), 8);

        reporter.observe();
        reporter.observe();
        reporter.observe();
        drop(reporter);

        let mut progress_events = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, ObserverEvent::Progress(_)) {
                progress_events += 1;
            }
        }
        assert_eq!(progress_events, 1);
    }

    #[tokio::test]
    async fn terminal_event_survives_full_channel() {
        let cell = Arc::new(ProgressCell::new());
        let (mut reporter, mut rx) = ProgressReporter::new(cell, Duration::ZERO, 1);

        reporter.observe(); // fills the single slot
        let finish = tokio::spawn(reporter.finish(ObserverEvent::Interrupted {
            reason: InterruptReason::Network,
            bytes_written: 2,
        }));

        let mut saw_terminal = false;
        while let Some(event) = rx.recv().await {
            if let ObserverEvent::Interrupted { bytes_written, .. } = event {
                assert_eq!(bytes_written, 2);
                saw_terminal = true;
            }
        }
        finish.await.unwrap();
        assert!(saw_terminal);
    }
}
