//! Producer statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by a producer
///
/// All counters are monotonic and updated with relaxed ordering; `snapshot`
/// is for diagnostics, not for synchronization.
#[derive(Debug, Default)]
pub struct ProducerStats {
    posted: AtomicU64,
    removed: AtomicU64,
    dropped_posts: AtomicU64,
    dropped_removes: AtomicU64,
    dismissals: AtomicU64,
    connects: AtomicU64,
    disconnects: AtomicU64,
}

impl ProducerStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_posted(&self) {
        self.posted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_removed(&self) {
        self.removed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_post(&self) {
        self.dropped_posts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped_remove(&self) {
        self.dropped_removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dismissal(&self) {
        self.dismissals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time snapshot of the counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            posted: self.posted.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            dropped_posts: self.dropped_posts.load(Ordering::Relaxed),
            dropped_removes: self.dropped_removes.load(Ordering::Relaxed),
            dismissals: self.dismissals.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of producer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Cards successfully forwarded to the registry
    pub posted: u64,
    /// Cards successfully removed
    pub removed: u64,
    /// Posts dropped while the service was unreachable
    pub dropped_posts: u64,
    /// Removes dropped while the service was unreachable
    pub dropped_removes: u64,
    /// Dismissal notifications delivered to the handler
    pub dismissals: u64,
    /// Successful connections
    pub connects: u64,
    /// Disconnections observed
    pub disconnects: u64,
}
