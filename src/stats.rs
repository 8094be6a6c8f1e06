//! Install and serving statistics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Summary of one successful install.
#[derive(Debug, Clone)]
pub struct InstallStats {
    /// Number of manifest assets stored in the bucket.
    pub assets_cached: usize,
    /// Total body bytes stored.
    pub total_bytes: u64,
    /// Wall-clock time for the whole population step.
    pub elapsed: Duration,
}

/// A point-in-time view of serving counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServeSnapshot {
    /// Requests answered from the bucket.
    pub hits: u64,
    /// Requests forwarded to the network.
    pub misses: u64,
    /// Forwarded requests whose network fetch failed.
    pub network_errors: u64,
}

impl ServeSnapshot {
    /// Total requests intercepted.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Atomic counters updated on every interception.
///
/// Counters are advisory; they never influence serving decisions.
#[derive(Debug, Default)]
pub struct ServeStats {
    hits: AtomicU64,
    misses: AtomicU64,
    network_errors: AtomicU64,
}

impl ServeStats {
    /// Creates zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            network_errors: AtomicU64::new(0),
        }
    }

    /// Records a bucket hit.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a miss that was forwarded to the network.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a forwarded request whose fetch failed.
    pub fn record_network_error(&self) {
        self.network_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a consistent-enough snapshot of the counters.
    #[must_use]
    pub fn snapshot(&self) -> ServeSnapshot {
        ServeSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
        }
    }
}
