//! Cooperative cancellation for in-flight calls.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::error::{AetherError, AetherResult};

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cloneable flag that aborts the calls it was handed to.
///
/// Cancellation is sticky: once cancelled, every later call using the same
/// signal fails immediately with [`AetherError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    state: Arc<CancelState>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Drive `fut` to completion unless `signal` fires first.
pub async fn run_cancellable<F: Future>(
    signal: Option<&CancelSignal>,
    fut: F,
) -> AetherResult<F::Output> {
    let Some(signal) = signal else {
        return Ok(fut.await);
    };
    if signal.is_cancelled() {
        return Err(AetherError::Cancelled);
    }
    tokio::select! {
        out = fut => Ok(out),
        _ = signal.cancelled() => Err(AetherError::Cancelled),
    }
}
