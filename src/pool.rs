// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Item Pool
//!
//! A lock-free free list of reusable [`LogItem`]s backed by
//! `crossbeam_queue::ArrayQueue`. The pool is pre-seeded at init, but its
//! capacity is a performance hint rather than a ceiling:
//!
//! - **acquire** never blocks and never fails. An empty free list falls back
//!   to a fresh allocation (allocator exhaustion aborts the process, which is
//!   the only fatal path).
//! - **release** empties the buffer and pushes it back. If the free list is
//!   full the item is freed on the spot, never retried.

use crossbeam_queue::ArrayQueue;
use std::sync::Arc;

use crate::client::{ClientId, MIN_CLIENT};
use crate::config::SharedLogConfig;
use crate::diag::Diagnostics;
use crate::item::LogItem;
use crate::stats::PipelineStats;

/// Free-list slots beyond the pre-seeded items
pub const POOL_SLACK: usize = 2;

const COMPONENT: &str = "pool";

/// Buffer sizing applied on allocation and recycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    /// Initial capacity of a fresh buffer
    pub min_alloc_size: usize,
    /// Buffers above this capacity are shrunk on release
    pub max_retained_capacity: usize,
}

impl From<&SharedLogConfig> for PoolLimits {
    fn from(config: &SharedLogConfig) -> Self {
        Self {
            min_alloc_size: config.message_min_alloc_size,
            max_retained_capacity: config.max_retained_capacity,
        }
    }
}

/// Lock-free pool of recyclable log items
pub struct ItemPool {
    free: ArrayQueue<LogItem>,
    limits: PoolLimits,
    stats: Arc<PipelineStats>,
    diag: Arc<Diagnostics>,
}

impl ItemPool {
    /// Create an empty pool with room for `capacity` idle items.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(
        capacity: usize,
        limits: PoolLimits,
        stats: Arc<PipelineStats>,
        diag: Arc<Diagnostics>,
    ) -> Self {
        Self {
            free: ArrayQueue::new(capacity),
            limits,
            stats,
            diag,
        }
    }

    /// Create a pool sized from `config` and seed it with
    /// `max_threads * items_per_thread` items.
    pub fn from_config(
        config: &SharedLogConfig,
        stats: Arc<PipelineStats>,
        diag: Arc<Diagnostics>,
    ) -> Self {
        let prefill = config.pool_prefill();
        let pool = Self::new(
            prefill.saturating_add(POOL_SLACK),
            PoolLimits::from(config),
            stats,
            diag,
        );
        let seeded = pool.seed(prefill);
        diag_debug!(pool.diag, COMPONENT, "seeded {} of {} items", seeded, prefill);
        pool
    }

    /// Pre-allocate up to `count` items; returns how many were stored
    pub fn seed(&self, count: usize) -> usize {
        let mut seeded = 0;
        for _ in 0..count {
            let item = LogItem::with_capacity(MIN_CLIENT, self.limits.min_alloc_size);
            if self.free.push(item).is_err() {
                break;
            }
            seeded += 1;
        }
        seeded
    }

    /// Take an empty item tagged with `client_id`.
    ///
    /// Never blocks, never fails: allocates when the free list is empty.
    pub fn acquire(&self, client_id: ClientId) -> LogItem {
        match self.free.pop() {
            Some(mut item) => {
                self.stats.record_pool_hit();
                item.reset(client_id);
                item
            }
            None => {
                self.stats.record_pool_miss();
                LogItem::with_capacity(client_id, self.limits.min_alloc_size)
            }
        }
    }

    /// Empty `item` and return it to the free list (or free it if full)
    pub fn release(&self, mut item: LogItem) {
        item.truncate_for_reuse(
            self.limits.min_alloc_size,
            self.limits.max_retained_capacity,
        );
        match self.free.push(item) {
            Ok(()) => self.stats.record_pool_return(),
            Err(rejected) => {
                self.stats.record_destroyed();
                diag_debug!(
                    self.diag,
                    COMPONENT,
                    "free list full ({} items), destroying returned item",
                    self.free.capacity()
                );
                drop(rejected);
            }
        }
    }

    /// Idle items currently in the free list
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Maximum number of idle items retained
    pub fn capacity(&self) -> usize {
        self.free.capacity()
    }
}
