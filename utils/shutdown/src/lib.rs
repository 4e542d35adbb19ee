//! Cooperative cancellation for the engine's background workers (Workload
//! Generator, Snapshot Scheduler, Replication Subsystem): a worker task holds
//! a [`Shutdown`] and polls [`Shutdown::is_cancelled`] (or races
//! [`Shutdown::cancelled`] against its own tick), its owner holds the paired
//! [`ShutdownHandle`] and calls [`ShutdownHandle::cancel`] to stop it.

use std::future::Future;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// The cancel-only half, kept by whoever started the worker.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// `true` once [`Self::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// The poll-only half, held inside the worker loop itself.
#[derive(Debug, Clone)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// `true` once the paired [`ShutdownHandle`] has cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancelled; intended for `tokio::select!` against a
    /// worker's own sleep/tick future.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Runs `fut` to completion, or returns `None` if cancelled first.
    pub async fn race<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

/// Creates a fresh, independent shutdown pair for one worker task.
pub fn pair() -> (ShutdownHandle, Shutdown) {
    let token = CancellationToken::new();
    (
        ShutdownHandle {
            token: token.clone(),
        },
        Shutdown { token },
    )
}
