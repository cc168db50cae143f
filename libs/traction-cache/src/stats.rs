//! Engine counters for monitoring cache behavior
//!
//! Counters are updated with relaxed atomics on the hot path; `snapshot()`
//! gives a coherent-enough copy for logs and dashboards.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics for monitoring engine and cache performance
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Interpolation requests answered from the persistent value cache
    pub value_hits: AtomicU64,
    /// Interpolation requests that missed the persistent value cache
    pub value_misses: AtomicU64,
    /// Curve lookups answered from the in-process curve cache
    pub curve_hits: AtomicU64,
    /// Curves built from stored points
    pub curve_builds: AtomicU64,
    /// Curve entries pruned under LRU capacity pressure
    pub curve_evictions: AtomicU64,
    /// Curve entries dropped past their TTL
    pub curve_expired: AtomicU64,
    /// Curves discarded because the norm changed while they were building
    pub stale_discards: AtomicU64,
    /// Value-cache writes skipped because the norm changed after evaluation
    pub stale_write_skips: AtomicU64,
    /// Evaluations clamped to the curve boundary
    pub clamped_evaluations: AtomicU64,
    /// Evaluations rejected as non-finite or negative
    pub numeric_rejections: AtomicU64,
    /// Best-effort cache writes that failed and were swallowed
    pub cache_write_failures: AtomicU64,
    /// Analysis requests answered from the analysis cache
    pub analysis_hits: AtomicU64,
    /// Analysis requests that missed the analysis cache
    pub analysis_misses: AtomicU64,
    /// Analysis entries discarded as expired on read
    pub analysis_expired: AtomicU64,
    /// Analysis entries removed by cleanup sweeps
    pub cleanup_removed: AtomicU64,
}

impl EngineStats {
    /// Get a snapshot of current stats
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            value_hits: self.value_hits.load(Ordering::Relaxed),
            value_misses: self.value_misses.load(Ordering::Relaxed),
            curve_hits: self.curve_hits.load(Ordering::Relaxed),
            curve_builds: self.curve_builds.load(Ordering::Relaxed),
            curve_evictions: self.curve_evictions.load(Ordering::Relaxed),
            curve_expired: self.curve_expired.load(Ordering::Relaxed),
            stale_discards: self.stale_discards.load(Ordering::Relaxed),
            stale_write_skips: self.stale_write_skips.load(Ordering::Relaxed),
            clamped_evaluations: self.clamped_evaluations.load(Ordering::Relaxed),
            numeric_rejections: self.numeric_rejections.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
            analysis_hits: self.analysis_hits.load(Ordering::Relaxed),
            analysis_misses: self.analysis_misses.load(Ordering::Relaxed),
            analysis_expired: self.analysis_expired.load(Ordering::Relaxed),
            cleanup_removed: self.cleanup_removed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of engine statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    pub value_hits: u64,
    pub value_misses: u64,
    pub curve_hits: u64,
    pub curve_builds: u64,
    pub curve_evictions: u64,
    pub curve_expired: u64,
    pub stale_discards: u64,
    pub stale_write_skips: u64,
    pub clamped_evaluations: u64,
    pub numeric_rejections: u64,
    pub cache_write_failures: u64,
    pub analysis_hits: u64,
    pub analysis_misses: u64,
    pub analysis_expired: u64,
    pub cleanup_removed: u64,
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = EngineStats::default();
        stats.value_hits.fetch_add(2, Ordering::Relaxed);
        stats.cleanup_removed.fetch_add(7, Ordering::Relaxed);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.value_hits, 2);
        assert_eq!(snapshot.cleanup_removed, 7);
        assert_eq!(snapshot.curve_builds, 0);
    }
}
