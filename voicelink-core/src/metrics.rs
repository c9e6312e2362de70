//! Lock-free diagnostic counters sampled by the reporter task.

use std::sync::atomic::{AtomicU64, Ordering};

/// Byte and session counters for one link.
///
/// The byte counters each have a single writer (the reader worker and the
/// writer worker respectively), so relaxed ordering is sufficient.
#[derive(Debug, Default)]
pub struct LinkMetrics {
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    connects: AtomicU64,
    disconnects: AtomicU64,
}

/// Point-in-time copy of [`LinkMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub connects: u64,
    pub disconnects: u64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_read(&self, n: usize) {
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn add_written(&self, n: usize) {
        self.bytes_written.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Sample all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
        }
    }
}
