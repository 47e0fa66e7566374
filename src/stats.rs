// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Pipeline counters.
//!
//! Each event bumps a local atomic (readable through [`StatsSnapshot`]) and
//! the matching counter in the `metrics` facade, so an installed recorder
//! (e.g. a Prometheus exporter) sees the same numbers.

use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the pool, queue path and dispatcher
#[derive(Debug, Default)]
pub struct PipelineStats {
    pool_hits: AtomicU64,
    pool_misses: AtomicU64,
    pool_returns: AtomicU64,
    items_destroyed: AtomicU64,
    items_enqueued: AtomicU64,
    items_dropped: AtomicU64,
    items_dispatched: AtomicU64,
    items_rejected: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Items served from the free list
    pub pool_hits: u64,
    /// Items freshly allocated because the free list was empty
    pub pool_misses: u64,
    /// Items pushed back onto the free list
    pub pool_returns: u64,
    /// Items freed because the free list refused them
    pub items_destroyed: u64,
    pub items_enqueued: u64,
    /// Items recycled because the queue was full or closed
    pub items_dropped: u64,
    pub items_dispatched: u64,
    /// Items whose client id had no sink
    pub items_rejected: u64,
    /// Pushes refused because the queue was full
    pub queue_overruns: u64,
    /// Lost CAS races while reserving a queue slot
    pub queue_cas_retries: u64,
}

/// Export the queue's own counters and depth to the metrics recorder.
///
/// The queue counts these itself, so they are published as absolute values
/// once per drain rather than per event.
pub(crate) fn publish_queue(depth: usize, overruns: u64, cas_retries: u64) {
    gauge!("shared_log_queue_depth").set(depth as f64);
    counter!("shared_log_queue_overruns_total").absolute(overruns);
    counter!("shared_log_queue_cas_retries_total").absolute(cas_retries);
}

#[inline]
fn bump(local: &AtomicU64, name: &'static str) {
    local.fetch_add(1, Ordering::Relaxed);
    counter!(name).increment(1);
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_pool_hit(&self) {
        bump(&self.pool_hits, "shared_log_pool_hits_total");
    }

    #[inline]
    pub(crate) fn record_pool_miss(&self) {
        bump(&self.pool_misses, "shared_log_pool_misses_total");
    }

    #[inline]
    pub(crate) fn record_pool_return(&self) {
        bump(&self.pool_returns, "shared_log_pool_returns_total");
    }

    #[inline]
    pub(crate) fn record_destroyed(&self) {
        bump(&self.items_destroyed, "shared_log_items_destroyed_total");
    }

    #[inline]
    pub(crate) fn record_enqueued(&self) {
        bump(&self.items_enqueued, "shared_log_items_enqueued_total");
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        bump(&self.items_dropped, "shared_log_items_dropped_total");
    }

    #[inline]
    pub(crate) fn record_dispatched(&self) {
        bump(&self.items_dispatched, "shared_log_items_dispatched_total");
    }

    #[inline]
    pub(crate) fn record_rejected(&self) {
        bump(&self.items_rejected, "shared_log_items_rejected_total");
    }

    /// Event counters; the queue fields are filled in by
    /// [`SharedLog::stats`](crate::SharedLog::stats)
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pool_hits: self.pool_hits.load(Ordering::Relaxed),
            pool_misses: self.pool_misses.load(Ordering::Relaxed),
            pool_returns: self.pool_returns.load(Ordering::Relaxed),
            items_destroyed: self.items_destroyed.load(Ordering::Relaxed),
            items_enqueued: self.items_enqueued.load(Ordering::Relaxed),
            items_dropped: self.items_dropped.load(Ordering::Relaxed),
            items_dispatched: self.items_dispatched.load(Ordering::Relaxed),
            items_rejected: self.items_rejected.load(Ordering::Relaxed),
            ..StatsSnapshot::default()
        }
    }
}

impl StatsSnapshot {
    /// Items acquired from the pool, either path
    pub fn items_acquired(&self) -> u64 {
        self.pool_hits + self.pool_misses
    }
}
