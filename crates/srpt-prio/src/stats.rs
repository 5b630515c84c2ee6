//! # Resolver Statistics
//!
//! Counters kept by the priority resolver. Snapshots serialize to JSON for
//! export alongside the transport's own statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// ─── Snapshot ───────────────────────────────────────────────────────────────

/// Point-in-time copy of the resolver counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    /// Cap-dependent table sets built (including the initial one).
    pub table_rebuilds: u64,
    /// Byte cap updates that matched the cached cap.
    pub cap_cache_hits: u64,
    /// Outbound messages resolved.
    pub unsched_lookups: u64,
    /// Scheduled packets resolved.
    pub sched_lookups: u64,
    /// Byte cap of the live table set.
    pub current_cap: u32,
}

impl ResolverStats {
    /// Fraction of cap updates served from the cache.
    pub fn cap_hit_ratio(&self) -> f64 {
        let updates = self.cap_cache_hits + self.table_rebuilds.saturating_sub(1);
        if updates == 0 {
            0.0
        } else {
            self.cap_cache_hits as f64 / updates as f64
        }
    }
}

// ─── Live Counters ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub table_rebuilds: AtomicU64,
    pub cap_cache_hits: AtomicU64,
    pub unsched_lookups: AtomicU64,
    pub sched_lookups: AtomicU64,
}

impl Counters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, current_cap: u32) -> ResolverStats {
        ResolverStats {
            table_rebuilds: self.table_rebuilds.load(Ordering::Relaxed),
            cap_cache_hits: self.cap_cache_hits.load(Ordering::Relaxed),
            unsched_lookups: self.unsched_lookups.load(Ordering::Relaxed),
            sched_lookups: self.sched_lookups.load(Ordering::Relaxed),
            current_cap,
        }
    }
}
