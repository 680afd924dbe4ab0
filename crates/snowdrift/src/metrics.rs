use core::sync::atomic::{AtomicU64, Ordering};

/// Counters the engine maintains for external collection.
///
/// These are operationally important but not part of the generation logic:
/// a rejected caller bumps nothing, and only the engine itself ever writes
/// them.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    ids_issued: AtomicU64,
    rollback_rejections: AtomicU64,
    exhaustion_waits: AtomicU64,
}

impl EngineMetrics {
    pub(crate) fn record_issued(&self) {
        self.ids_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollback_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exhaustion_wait(&self) {
        self.exhaustion_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ids_issued(&self) -> u64 {
        self.ids_issued.load(Ordering::Relaxed)
    }

    pub fn rollback_rejections(&self) -> u64 {
        self.rollback_rejections.load(Ordering::Relaxed)
    }

    pub fn exhaustion_waits(&self) -> u64 {
        self.exhaustion_waits.load(Ordering::Relaxed)
    }
}

/// A point-in-time view of the engine's gauges and counters.
///
/// `datacenter_id` and `worker_id` are static gauges: they never change for
/// the lifetime of the process but belong in the same scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub datacenter_id: u64,
    pub worker_id: u64,
    pub ids_issued: u64,
    pub rollback_rejections: u64,
    pub exhaustion_waits: u64,
}
