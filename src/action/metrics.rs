//! Metrics collection for terms count executions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::action::response::TermsCountResponse;

/// Snapshot of execution metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsCountMetrics {
    /// Number of requests executed.
    pub total_requests: u64,

    /// Requests that produced a response.
    pub successful_requests: u64,

    /// Requests rejected before dispatch or abandoned on timeout.
    pub failed_requests: u64,

    /// Requests abandoned on timeout.
    pub timeout_count: u64,

    /// Shards dispatched across all requests.
    pub shards_total: u64,

    /// Shards that returned counts.
    pub shards_successful: u64,

    /// Shards that failed.
    pub shards_failed: u64,

    /// Shards skipped because they were no longer active on their owner.
    pub shards_not_servable: u64,

    /// Total execution time across all requests.
    pub total_execution_time: Duration,

    /// Average execution time per request.
    pub avg_execution_time: Duration,

    /// Maximum execution time observed.
    pub max_execution_time: Duration,

    /// Minimum execution time observed.
    pub min_execution_time: Duration,
}

/// Collector for gathering metrics across concurrent executions.
#[derive(Debug)]
pub struct TermsCountMetricsCollector {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    timeout_count: AtomicU64,
    shards_total: AtomicU64,
    shards_successful: AtomicU64,
    shards_failed: AtomicU64,
    shards_not_servable: AtomicU64,
    total_execution_nanos: AtomicU64,
    max_execution_nanos: AtomicU64,
    min_execution_nanos: AtomicU64,
}

impl TermsCountMetricsCollector {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            timeout_count: AtomicU64::new(0),
            shards_total: AtomicU64::new(0),
            shards_successful: AtomicU64::new(0),
            shards_failed: AtomicU64::new(0),
            shards_not_servable: AtomicU64::new(0),
            total_execution_nanos: AtomicU64::new(0),
            max_execution_nanos: AtomicU64::new(0),
            min_execution_nanos: AtomicU64::new(u64::MAX),
        }
    }

    /// Record a request that produced a response.
    pub fn record_response(&self, execution_time: Duration, response: &TermsCountResponse) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
        self.shards_total
            .fetch_add(response.total_shards() as u64, Ordering::Relaxed);
        self.shards_successful
            .fetch_add(response.successful_shards() as u64, Ordering::Relaxed);
        self.shards_failed
            .fetch_add(response.failed_shards() as u64, Ordering::Relaxed);
        let not_servable = response
            .total_shards()
            .saturating_sub(response.successful_shards())
            .saturating_sub(response.failed_shards());
        self.shards_not_servable
            .fetch_add(not_servable as u64, Ordering::Relaxed);
        self.record_execution(execution_time);
    }

    /// Record a request that ended with an error.
    pub fn record_failure(&self, execution_time: Duration, timed_out: bool) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.timeout_count.fetch_add(1, Ordering::Relaxed);
        }
        self.record_execution(execution_time);
    }

    fn record_execution(&self, execution_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let nanos = execution_time.as_nanos() as u64;
        self.total_execution_nanos
            .fetch_add(nanos, Ordering::Relaxed);
        self.max_execution_nanos.fetch_max(nanos, Ordering::Relaxed);
        self.min_execution_nanos.fetch_min(nanos, Ordering::Relaxed);
    }

    /// Get the current metrics snapshot.
    pub fn snapshot(&self) -> TermsCountMetrics {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_nanos = self.total_execution_nanos.load(Ordering::Relaxed);

        let avg_nanos = if total_requests > 0 {
            total_nanos / total_requests
        } else {
            0
        };

        let min_nanos = self.min_execution_nanos.load(Ordering::Relaxed);
        let min_duration = if min_nanos == u64::MAX {
            Duration::ZERO
        } else {
            Duration::from_nanos(min_nanos)
        };

        TermsCountMetrics {
            total_requests,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            timeout_count: self.timeout_count.load(Ordering::Relaxed),
            shards_total: self.shards_total.load(Ordering::Relaxed),
            shards_successful: self.shards_successful.load(Ordering::Relaxed),
            shards_failed: self.shards_failed.load(Ordering::Relaxed),
            shards_not_servable: self.shards_not_servable.load(Ordering::Relaxed),
            total_execution_time: Duration::from_nanos(total_nanos),
            avg_execution_time: Duration::from_nanos(avg_nanos),
            max_execution_time: Duration::from_nanos(
                self.max_execution_nanos.load(Ordering::Relaxed),
            ),
            min_execution_time: min_duration,
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.timeout_count.store(0, Ordering::Relaxed);
        self.shards_total.store(0, Ordering::Relaxed);
        self.shards_successful.store(0, Ordering::Relaxed);
        self.shards_failed.store(0, Ordering::Relaxed);
        self.shards_not_servable.store(0, Ordering::Relaxed);
        self.total_execution_nanos.store(0, Ordering::Relaxed);
        self.max_execution_nanos.store(0, Ordering::Relaxed);
        self.min_execution_nanos.store(u64::MAX, Ordering::Relaxed);
    }
}

impl Default for TermsCountMetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return elapsed time.
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::response::ShardFailure;
    use crate::cluster::ShardId;
    use crate::shard::aggregator::TermCounts;

    #[test]
    fn test_metrics_collection() {
        let collector = TermsCountMetricsCollector::new();

        let response = TermsCountResponse::new(
            4,
            2,
            1,
            vec![ShardFailure::new(&ShardId::new("books", 2), "boom")],
            TermCounts::new(),
        );
        collector.record_response(Duration::from_millis(100), &response);
        collector.record_response(Duration::from_millis(50), &response);
        collector.record_failure(Duration::from_millis(200), true);

        let metrics = collector.snapshot();

        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.successful_requests, 2);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.timeout_count, 1);
        assert_eq!(metrics.shards_total, 8);
        assert_eq!(metrics.shards_successful, 4);
        assert_eq!(metrics.shards_failed, 2);
        assert_eq!(metrics.shards_not_servable, 2);

        // Check timing metrics
        assert_eq!(metrics.min_execution_time, Duration::from_millis(50));
        assert_eq!(metrics.max_execution_time, Duration::from_millis(200));
        assert!(metrics.avg_execution_time >= Duration::from_millis(100));
        assert!(metrics.avg_execution_time <= Duration::from_millis(120));

        collector.reset();
        let metrics = collector.snapshot();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.shards_not_servable, 0);
        assert_eq!(metrics.min_execution_time, Duration::ZERO);
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.stop();

        assert!(elapsed >= Duration::from_millis(10));
    }
}
