use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A snapshot of executor activity for orchestration and draining.
///
/// Facts only; no policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorSignals {
    pub inflight: usize,
    pub completed: u64,
    pub short_circuited: u64,
    pub failed: u64,
    pub backpressure: Option<InflightSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflightSnapshot {
    pub max: usize,
    pub available: usize,
    pub in_use: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    inflight: AtomicUsize,
    completed: AtomicU64,
    short_circuited: AtomicU64,
    failed: AtomicU64,
    idle: Notify,
}

impl Counters {
    pub(crate) fn enter(self: &Arc<Self>) -> InflightGuard {
        self.inflight.fetch_add(1, Ordering::SeqCst);
        InflightGuard {
            counters: Arc::clone(self),
        }
    }

    pub(crate) fn record(&self, short_circuited: bool, failed: bool) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if short_circuited {
            self.short_circuited.fetch_add(1, Ordering::Relaxed);
        }
        if failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self, backpressure: Option<InflightSnapshot>) -> ExecutorSignals {
        ExecutorSignals {
            inflight: self.inflight(),
            completed: self.completed.load(Ordering::Relaxed),
            short_circuited: self.short_circuited.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            backpressure,
        }
    }

    /// Resolves once no execution is in flight.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inflight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Decrements the in-flight count on drop, including when the execution
/// future is dropped before completion.
pub(crate) struct InflightGuard {
    counters: Arc<Counters>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        if self.counters.inflight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.counters.idle.notify_waiters();
        }
    }
}
