use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Run-wide counters shared by every analysis worker.
pub struct AnalysisMetrics {
    // Items
    submitted: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,

    // Model calls
    retries: AtomicUsize,
    repaired: AtomicUsize,

    // Timing (in microseconds), successful items only
    total_latency_us: AtomicU64,
}

impl AnalysisMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            submitted: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
            repaired: AtomicUsize::new(0),
            total_latency_us: AtomicU64::new(0),
        })
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, duration: Duration, repaired: bool) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        if repaired {
            self.repaired.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retries(&self, retries: usize) {
        self.retries.fetch_add(retries, Ordering::Relaxed);
    }

    pub fn record_skipped(&self, count: usize) {
        self.skipped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let total_us = self.total_latency_us.load(Ordering::Relaxed) as f64;
        MetricsSnapshot {
            processed: self.submitted.load(Ordering::Relaxed),
            succeeded,
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            repaired: self.repaired.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            avg_latency_ms: if succeeded > 0 {
                total_us / succeeded as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}

/// Serializable view of [`AnalysisMetrics`], reported as the `processing`
/// block of the summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub repaired: usize,
    pub retries: usize,
    #[serde(default)]
    pub avg_latency_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = AnalysisMetrics::new();
        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_success(Duration::from_millis(4), true);
        metrics.record_failure();
        metrics.record_retries(2);
        metrics.record_skipped(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.succeeded, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.repaired, 1);
        assert_eq!(snapshot.retries, 2);
        assert_eq!(snapshot.skipped, 3);
        assert!((snapshot.avg_latency_ms - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(AnalysisMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
