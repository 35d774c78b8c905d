//! Cooperative cancellation for a running download.
//!
//! A cancel request flips a shared flag and wakes the write loop, which
//! observes it at the next pull/write boundary, never pre-emptively
//! mid-write. After the loop observes it, no further stream bytes are
//! written.

use tokio::sync::watch;

/// Shared cancel token for one download. Clone freely; any clone can
/// request cancellation.
#[derive(Clone)]
pub struct CancelToken {
    tx: watch::Sender<bool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        let (tx, _rx) = watch::channel(false);
        CancelToken { tx }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // wait_for checks the current value first, so a pre-existing cancel
        // resolves immediately. The sender lives in self, so this cannot err.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_flips_flag_and_wakes_waiter() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_after_cancel() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel(); // idempotent
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("already-cancelled token should not wait");
    }
}
