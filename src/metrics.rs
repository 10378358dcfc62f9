// Operation metrics
//
// Lightweight counters for the orchestration layer, logged on shutdown

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Session metrics for dispatched operations
///
/// Uses atomic operations so workers and the UI thread can record without locks.
#[derive(Debug)]
pub struct Metrics {
    /// Dispatches that spawned a worker
    pub dispatches_accepted: AtomicU64,

    /// Dispatches refused locally (no selection, already running)
    pub dispatches_rejected: AtomicU64,

    /// Operations that finished with a full result
    pub operations_completed: AtomicU64,

    /// Operations that finished with a partial result
    pub operations_partial: AtomicU64,

    /// Operations that finished with an error
    pub operations_failed: AtomicU64,

    /// Operations detached by the user
    pub operations_aborted: AtomicU64,

    /// Events for a request or catalog load that was no longer current
    pub stale_events_dropped: AtomicU64,

    /// Events applied on the UI thread
    pub ui_events_drained: AtomicU64,

    /// Wall time from dispatch to terminal event, summed
    pub total_operation_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            dispatches_accepted: AtomicU64::new(0),
            dispatches_rejected: AtomicU64::new(0),
            operations_completed: AtomicU64::new(0),
            operations_partial: AtomicU64::new(0),
            operations_failed: AtomicU64::new(0),
            operations_aborted: AtomicU64::new(0),
            stale_events_dropped: AtomicU64::new(0),
            ui_events_drained: AtomicU64::new(0),
            total_operation_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_dispatch_accepted(&self) {
        self.dispatches_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch_rejected(&self) {
        self.dispatches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self, partial: bool) {
        if partial {
            self.operations_partial.fetch_add(1, Ordering::Relaxed);
        } else {
            self.operations_completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_failed(&self) {
        self.operations_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_aborted(&self) {
        self.operations_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_event(&self) {
        self.stale_events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_events_drained(&self, count: usize) {
        self.ui_events_drained
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_operation_time(&self, duration: Duration) {
        self.total_operation_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time per finished operation in milliseconds
    pub fn avg_operation_time_ms(&self) -> f64 {
        let total = self.total_operation_time_ms.load(Ordering::Relaxed);
        let count = self.operations_completed.load(Ordering::Relaxed)
            + self.operations_partial.load(Ordering::Relaxed)
            + self.operations_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Dispatches: {} accepted, {} rejected",
            self.dispatches_accepted.load(Ordering::Relaxed),
            self.dispatches_rejected.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Operations: {} completed, {} partial, {} failed, {} aborted (avg: {:.2}ms)",
            self.operations_completed.load(Ordering::Relaxed),
            self.operations_partial.load(Ordering::Relaxed),
            self.operations_failed.load(Ordering::Relaxed),
            self.operations_aborted.load(Ordering::Relaxed),
            self.avg_operation_time_ms()
        );
        tracing::info!(
            "UI events drained: {}, stale events dropped: {}",
            self.ui_events_drained.load(Ordering::Relaxed),
            self.stale_events_dropped.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
