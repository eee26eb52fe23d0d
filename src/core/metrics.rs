//! Dispatch metrics for the registry
//!
//! Counters describing what happened to records handed to a
//! [`Registry`](crate::Registry): delivered, dropped, filtered and failed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for registry observability
///
/// # Example
///
/// ```
/// use rust_logit::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_logged();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_logged(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records accepted by at least one backend
    total_logged: AtomicU64,

    /// Records whose explicit target was out of range or disabled
    dropped_count: AtomicU64,

    /// Records below the registry's minimum level
    filtered_count: AtomicU64,

    /// Individual backend calls that returned an error or panicked
    backend_failures: AtomicU64,

    /// Individual backend calls rejected by a full bounded queue
    queue_overflows: AtomicU64,
}

impl LoggerMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            total_logged: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
            filtered_count: AtomicU64::new(0),
            backend_failures: AtomicU64::new(0),
            queue_overflows: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered_count(&self) -> u64 {
        self.filtered_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn backend_failures(&self) -> u64 {
        self.backend_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_overflows(&self) -> u64 {
        self.queue_overflows.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_backend_failure(&self) -> u64 {
        self.backend_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_overflow(&self) -> u64 {
        self.queue_overflows.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no records have been dispatched.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_logged() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.total_logged.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.filtered_count.store(0, Ordering::Relaxed);
        self.backend_failures.store(0, Ordering::Relaxed);
        self.queue_overflows.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            total_logged: AtomicU64::new(self.total_logged()),
            dropped_count: AtomicU64::new(self.dropped_count()),
            filtered_count: AtomicU64::new(self.filtered_count()),
            backend_failures: AtomicU64::new(self.backend_failures()),
            queue_overflows: AtomicU64::new(self.queue_overflows()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_reset() {
        let metrics = LoggerMetrics::new();
        metrics.record_logged();
        metrics.record_logged();
        metrics.record_logged();
        metrics.record_dropped();
        metrics.record_filtered();
        metrics.record_backend_failure();
        metrics.record_queue_overflow();

        assert_eq!(metrics.total_logged(), 3);
        assert_eq!(metrics.dropped_count(), 1);
        assert_eq!(metrics.filtered_count(), 1);
        assert_eq!(metrics.backend_failures(), 1);
        assert_eq!(metrics.queue_overflows(), 1);
        assert!((metrics.drop_rate() - 25.0).abs() < f64::EPSILON);

        let snapshot = metrics.clone();
        metrics.reset();
        assert_eq!(metrics.total_logged(), 0);
        assert_eq!(metrics.drop_rate(), 0.0);
        assert_eq!(snapshot.total_logged(), 3);
    }
}
