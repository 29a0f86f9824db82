//! Global atomic counters for grading activity.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. before the CLI exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lock-free counters.
pub struct Metrics {
    students_aggregated: AtomicU64,
    flags_raised: AtomicU64,
    batches_published: AtomicU64,
    batches_rejected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            students_aggregated: AtomicU64::new(0),
            flags_raised: AtomicU64::new(0),
            batches_published: AtomicU64::new(0),
            batches_rejected: AtomicU64::new(0),
        }
    }

    pub fn add_students_aggregated(&self, n: u64) {
        self.students_aggregated.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "students_aggregated", n, "counter incremented");
    }

    pub fn add_flags_raised(&self, n: u64) {
        self.flags_raised.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "flags_raised", n, "counter incremented");
    }

    pub fn inc_batches_published(&self) {
        self.batches_published.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "batches_published", "counter incremented");
    }

    pub fn inc_batches_rejected(&self) {
        self.batches_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "batches_rejected", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            students_aggregated = self.students_aggregated(),
            flags_raised = self.flags_raised(),
            batches_published = self.batches_published(),
            batches_rejected = self.batches_rejected(),
        );
    }

    pub fn students_aggregated(&self) -> u64 {
        self.students_aggregated.load(Ordering::Relaxed)
    }

    pub fn flags_raised(&self) -> u64 {
        self.flags_raised.load(Ordering::Relaxed)
    }

    pub fn batches_published(&self) -> u64 {
        self.batches_published.load(Ordering::Relaxed)
    }

    pub fn batches_rejected(&self) -> u64 {
        self.batches_rejected.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.students_aggregated.store(0, Ordering::Relaxed);
        self.flags_raised.store(0, Ordering::Relaxed);
        self.batches_published.store(0, Ordering::Relaxed);
        self.batches_rejected.store(0, Ordering::Relaxed);
    }
}
