//! Cooperative cancellation for a dispatch session.

use tokio::sync::watch;

/// Fires a session's `CancelToken`s.
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

/// Observed by long-running stages. Clones share the same signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// New canceller/token pair.
pub fn cancel_pair() -> (Canceller, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (
        Canceller {
            tx: std::sync::Arc::new(tx),
        },
        CancelToken { rx },
    )
}

impl Canceller {
    pub fn cancel(&self) {
        // send_replace works even when no receiver is alive
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    /// Token that can never fire.
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled. Pends forever if the canceller is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
