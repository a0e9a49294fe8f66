//! Primitives shared by every measurement phase

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Byte counter shared by the workers and the progress clock of one phase
#[derive(Debug, Clone, Default)]
pub struct SharedCounter(Arc<AtomicU64>);

impl SharedCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bytes: u64) {
        self.0.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn load(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Stop conditions of a phase: its cancellation token and optional deadline
#[derive(Debug, Clone)]
pub struct PhaseGuard {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl PhaseGuard {
    pub fn new(token: CancellationToken, deadline: Option<Instant>) -> Self {
        Self { token, deadline }
    }

    /// Guard that only stops on cancellation
    pub fn unbounded(token: CancellationToken) -> Self {
        Self::new(token, None)
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the phase should stop issuing work
    pub fn is_done(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Run `fut` until it finishes, or return `None` as soon as the token
    /// fires or the deadline passes.
    ///
    /// Stop conditions are checked before `fut` is first polled, so nothing
    /// is sent once the phase is over.
    pub async fn bound<F: Future>(&self, fut: F) -> Option<F::Output> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            _ = deadline => None,
            output = fut => Some(output),
        }
    }
}
