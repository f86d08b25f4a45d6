use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters of the degree resolver.
#[derive(Debug, Default)]
pub struct ResolverStats {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cover_computations: AtomicU64,
    skipped_sources: AtomicU64,
    degraded_destinations: AtomicU64,
    failed_requests: AtomicU64,
}

/// Point-in-time copy of [`ResolverStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverStatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cover_computations: u64,
    pub skipped_sources: u64,
    pub degraded_destinations: u64,
    pub failed_requests: u64,
}

impl ResolverStats {
    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cover_computation(&self) {
        self.cover_computations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped_sources(&self, count: usize) {
        self.skipped_sources
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_degraded_destination(&self) {
        self.degraded_destinations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_request(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cover_computations: self.cover_computations.load(Ordering::Relaxed),
            skipped_sources: self.skipped_sources.load(Ordering::Relaxed),
            degraded_destinations: self.degraded_destinations.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
        }
    }
}
