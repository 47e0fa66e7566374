// SPDX-License-Identifier: Apache-2.0 OR MIT
//! The pipeline context object.
//!
//! [`SharedLog::init`] builds one independent pipeline (pool, queue,
//! registry, counters) and returns a cloneable producer handle plus the
//! single [`Dispatcher`] that drains it. There is no process-wide state, so
//! several pipelines can coexist.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::client::{Client, ClientId};
use crate::config::SharedLogConfig;
use crate::diag::Diagnostics;
use crate::dispatcher::Dispatcher;
use crate::error::InitError;
use crate::item::LogItem;
use crate::pool::ItemPool;
use crate::queue::MessageQueue;
use crate::registry::ThreadRegistry;
use crate::sink::SinkTable;
use crate::stats::{PipelineStats, StatsSnapshot};

const COMPONENT: &str = "shared_log";

pub(crate) struct Shared {
    pub(crate) pool: ItemPool,
    pub(crate) queue: MessageQueue,
    pub(crate) registry: ThreadRegistry,
    pub(crate) stats: Arc<PipelineStats>,
    pub(crate) diag: Arc<Diagnostics>,
    started_at: Instant,
    start_time: DateTime<Utc>,
    closed: AtomicBool,
    finished: AtomicBool,
}

impl Shared {
    /// Recycle everything still queued after the final drain.
    ///
    /// Loops until the queue reads empty, so records whose slot was still
    /// being written, or that another sweeper held the consumer flag for, are
    /// not missed.
    fn sweep_late(&self) -> usize {
        let mut swept = 0;
        loop {
            match self.queue.try_pop() {
                Some(item) => {
                    self.stats.record_dropped();
                    self.pool.release(item);
                    swept += 1;
                }
                None if self.queue.is_empty() => return swept,
                None => thread::yield_now(),
            }
        }
    }

    /// A producer pushed and then saw the close: the final drain may have
    /// missed its record. Wait for the drain to finish, then recycle leftovers.
    #[cold]
    fn settle_late_submit(&self) {
        while !self.finished.load(Ordering::Acquire) {
            thread::yield_now();
        }
        self.sweep_late();
    }
}

/// Producer handle for one pipeline. Cheap to clone (a single `Arc`).
#[derive(Clone)]
pub struct SharedLog {
    inner: Arc<Shared>,
}

impl SharedLog {
    /// Build a pipeline.
    ///
    /// Validates `config`, pre-seeds the item pool, creates the queue and
    /// registry, registers the calling thread and moves `sinks` into the
    /// returned dispatcher.
    pub fn init(
        config: &SharedLogConfig,
        sinks: SinkTable,
    ) -> Result<(Self, Dispatcher), InitError> {
        config.validate()?;

        let diag = Arc::new(Diagnostics::new(config.diag_level));
        diag_info!(diag, COMPONENT, "Initializing shared logging");

        let stats = Arc::new(PipelineStats::new());
        let registry = ThreadRegistry::new(config.max_threads, Arc::clone(&diag));
        registry.ensure_registered();

        let pool = ItemPool::from_config(config, Arc::clone(&stats), Arc::clone(&diag));
        let queue = MessageQueue::new(config.queue_capacity);

        for client in Client::ALL {
            if !sinks.is_installed(client) {
                diag_warning!(diag, COMPONENT, "No sink installed for client {}", client);
            }
        }

        let log = Self {
            inner: Arc::new(Shared {
                pool,
                queue,
                registry,
                stats,
                diag,
                started_at: Instant::now(),
                start_time: Utc::now(),
                closed: AtomicBool::new(false),
                finished: AtomicBool::new(false),
            }),
        };

        diag_info!(
            log.inner.diag,
            COMPONENT,
            "Initializing shared logging done (pool {} items, queue {} slots)",
            log.inner.pool.available(),
            log.inner.queue.capacity()
        );

        let dispatcher = Dispatcher::new(log.clone(), sinks);
        Ok((log, dispatcher))
    }

    #[inline]
    pub(crate) fn inner(&self) -> &Shared {
        &self.inner
    }

    /// Register the calling thread with this pipeline (idempotent)
    #[inline]
    pub fn ensure_registered(&self) {
        self.inner.registry.ensure_registered();
    }

    /// Take an empty record for `client_id`.
    ///
    /// Never blocks and never fails. The item must end up in exactly one of
    /// [`submit`](Self::submit) or [`recycle`](Self::recycle).
    pub fn get_item(&self, client_id: ClientId) -> LogItem {
        self.inner.registry.ensure_registered();
        self.inner.pool.acquire(client_id)
    }

    /// Hand a filled record to the consumer. Fire-and-forget: if the queue is
    /// full (or the pipeline has shut down) the record is silently recycled.
    ///
    /// A submit racing with shutdown either reaches the final drain or is
    /// recycled; it never stays behind in the queue.
    pub fn submit(&self, item: LogItem) {
        let shared = &self.inner;
        if shared.closed.load(Ordering::Acquire) {
            shared.stats.record_dropped();
            shared.pool.release(item);
            return;
        }

        shared.registry.ensure_registered();
        match shared.queue.try_push(item) {
            Ok(()) => {
                shared.stats.record_enqueued();
                // Pairs with the fence in close(): either the final drain
                // sees this record or this load sees the close.
                fence(Ordering::SeqCst);
                if shared.closed.load(Ordering::Relaxed) {
                    shared.settle_late_submit();
                }
            }
            Err(item) => {
                shared.stats.record_dropped();
                shared.pool.release(item);
            }
        }
    }

    /// Return a record that will not be submitted
    pub fn recycle(&self, item: LogItem) {
        self.inner.pool.release(item);
    }

    /// Submit `message` verbatim for `client`
    pub fn log_str(&self, client: Client, message: &str) {
        let mut item = self.get_item(client.id());
        item.push_str(message);
        self.submit(item);
    }

    /// Format `args` into a pooled record and submit it for `client`
    pub fn log_fmt(&self, client: Client, args: fmt::Arguments<'_>) {
        let mut item = self.get_item(client.id());
        // A failing Display impl still leaves whatever it wrote
        let _ = fmt::Write::write_fmt(&mut item, args);
        self.submit(item);
    }

    /// Monotonic time since [`init`](Self::init)
    pub fn elapsed_time_since_start(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    /// Wall-clock time of [`init`](Self::init)
    pub fn start_time(&self) -> DateTime<Utc> {
        self.inner.start_time
    }

    /// Wall-clock start time in whole seconds since the Unix epoch
    pub fn start_time_sec(&self) -> i64 {
        self.inner.start_time.timestamp()
    }

    /// Counters, including the queue's own overrun and CAS-retry counts
    pub fn stats(&self) -> StatsSnapshot {
        let queue = &self.inner.queue;
        StatsSnapshot {
            queue_overruns: queue.overruns(),
            queue_cas_retries: queue.cas_failures(),
            ..self.inner.stats.snapshot()
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.diag
    }

    pub fn registry(&self) -> &ThreadRegistry {
        &self.inner.registry
    }

    /// Idle items in the pool
    pub fn pool_available(&self) -> usize {
        self.inner.pool.available()
    }

    /// Records waiting in the queue
    pub fn queued(&self) -> usize {
        self.inner.queue.len()
    }

    /// Whether the pipeline has been shut down
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Stop accepting records; later submits are recycled
    pub(crate) fn close(&self) {
        self.inner.closed.store(true, Ordering::Relaxed);
        fence(Ordering::SeqCst);
    }

    /// Mark the final drain as done and recycle anything that slipped in
    /// behind it. Returns the number of records recycled.
    pub(crate) fn finish(&self) -> usize {
        self.inner.finished.store(true, Ordering::Release);
        self.inner.sweep_late()
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::Acquire)
    }
}

impl fmt::Debug for SharedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedLog")
            .field("queued", &self.queued())
            .field("pool_available", &self.pool_available())
            .field("threads", &self.inner.registry.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
