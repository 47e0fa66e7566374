// SPDX-License-Identifier: Apache-2.0 OR MIT
//! End-to-end pipeline scenarios
//!
//! Each test builds an independent pipeline with capture sinks, drives
//! producers from one or more threads and drains with the dispatcher or
//! the flush scheduler.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use shared_log::{
    Client, Dispatcher, FlushScheduler, LogItem, LogSink, LogSystem, Severity, SharedLog,
    SharedLogConfig, SinkTable,
};

type Records = Arc<Mutex<Vec<String>>>;

struct CaptureSink {
    records: Records,
}

impl LogSink for CaptureSink {
    fn write_item(&mut self, item: &LogItem) {
        self.records.lock().unwrap().push(item.as_str().to_owned());
    }

    fn flush(&mut self) {}
}

fn capture_sinks() -> (SinkTable, Records, Records) {
    let txt = Records::default();
    let msc = Records::default();
    let sinks = SinkTable::new()
        .with_sink(
            Client::Txt,
            Box::new(CaptureSink {
                records: Arc::clone(&txt),
            }),
        )
        .with_sink(
            Client::Msc,
            Box::new(CaptureSink {
                records: Arc::clone(&msc),
            }),
        );
    (sinks, txt, msc)
}

fn quiet(config: SharedLogConfig) -> SharedLogConfig {
    SharedLogConfig {
        diag_level: Severity::Emergency,
        ..config
    }
}

fn pipeline(config: SharedLogConfig) -> (SharedLog, Dispatcher, Records, Records) {
    let (sinks, txt, msc) = capture_sinks();
    let (log, dispatcher) = SharedLog::init(&quiet(config), sinks).unwrap();
    (log, dispatcher, txt, msc)
}

#[test]
fn test_fifo_delivery_after_single_drain() {
    let (log, mut dispatcher, txt, msc) = pipeline(SharedLogConfig::with_max_threads(2));

    log.log_str(Client::Txt, "first");
    log.log_str(Client::Msc, "side");
    log.log_str(Client::Txt, "second");
    log.log_str(Client::Txt, "third");

    let report = dispatcher.drain();
    assert_eq!(report.dispatched, 4);
    assert_eq!(report.rejected, 0);
    assert_eq!(*txt.lock().unwrap(), vec!["first", "second", "third"]);
    assert_eq!(*msc.lock().unwrap(), vec!["side"]);
    assert_eq!(log.queued(), 0);
}

#[test]
fn test_registration_is_idempotent() {
    let (log, _dispatcher, _, _) = pipeline(SharedLogConfig::with_max_threads(2));
    // init registered us already
    assert_eq!(log.registry().len(), 1);

    log.ensure_registered();
    log.ensure_registered();
    assert_eq!(log.registry().len(), 1);

    let other = log.clone();
    thread::spawn(move || {
        other.ensure_registered();
        other.ensure_registered();
    })
    .join()
    .unwrap();
    assert_eq!(log.registry().len(), 2);
}

#[test]
fn test_recycled_item_comes_back_empty() {
    let config = SharedLogConfig {
        items_per_thread: 1,
        ..SharedLogConfig::with_max_threads(1)
    };
    let (log, _dispatcher, _, _) = pipeline(config);

    // Drain the pre-seeded item so the next acquire must be the recycled one
    let mut item = log.get_item(Client::Txt.id());
    assert_eq!(log.pool_available(), 0);
    item.push_str("stale contents");
    log.recycle(item);
    assert_eq!(log.pool_available(), 1);

    let item = log.get_item(Client::Msc.id());
    assert!(item.is_empty());
    assert_eq!(item.client(), Some(Client::Msc));
    assert!(item.capacity() >= 256);
}

#[test]
fn test_acquire_grows_past_empty_pool() {
    let config = SharedLogConfig {
        items_per_thread: 1,
        ..SharedLogConfig::with_max_threads(1)
    };
    let (log, _dispatcher, _, _) = pipeline(config);
    assert_eq!(log.pool_available(), 1);

    let items: Vec<_> = (0..5).map(|_| log.get_item(Client::Txt.id())).collect();
    assert_eq!(items.len(), 5);
    assert!(items.iter().all(|item| item.is_empty()));

    let stats = log.stats();
    assert_eq!(stats.pool_hits, 1);
    assert_eq!(stats.pool_misses, 4);
    assert_eq!(stats.items_acquired(), 5);

    // Pool holds prefill + 2; the rest are destroyed
    for item in items {
        log.recycle(item);
    }
    let stats = log.stats();
    assert_eq!(stats.pool_returns, 3);
    assert_eq!(stats.items_destroyed, 2);
}

#[test]
fn test_concurrent_producers_deliver_every_tag_once() {
    let (log, mut dispatcher, txt, _) = pipeline(SharedLogConfig::with_max_threads(4));

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let log = log.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    log.log_fmt(Client::Txt, format_args!("t{}-{}", t, i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let report = dispatcher.drain();
    assert_eq!(report.dispatched, 40);

    let records = txt.lock().unwrap();
    assert_eq!(records.len(), 40);
    let tags: HashSet<_> = records.iter().cloned().collect();
    let expected: HashSet<_> = (0..4)
        .flat_map(|t| (0..10).map(move |i| format!("t{}-{}", t, i)))
        .collect();
    assert_eq!(tags, expected);

    // Per-producer order survives interleaving
    for t in 0..4 {
        let prefix = format!("t{}-", t);
        let seq: Vec<usize> = records
            .iter()
            .filter_map(|r| r.strip_prefix(&prefix))
            .map(|n| n.parse().unwrap())
            .collect();
        assert_eq!(seq, (0..10).collect::<Vec<_>>());
    }

    assert_eq!(log.registry().len(), 5);
}

#[test]
fn test_bad_client_id_is_rejected_and_drain_continues() {
    let (log, mut dispatcher, txt, msc) = pipeline(SharedLogConfig::with_max_threads(2));

    let mut bad = log.get_item(99);
    bad.push_str("nowhere to go");
    log.submit(bad);
    log.log_str(Client::Txt, "after");
    log.log_str(Client::Msc, "also after");

    let report = dispatcher.drain();
    assert_eq!(report.rejected, 1);
    assert_eq!(report.dispatched, 2);
    assert_eq!(*txt.lock().unwrap(), vec!["after"]);
    assert_eq!(*msc.lock().unwrap(), vec!["also after"]);

    assert_eq!(log.diagnostics().reported(Severity::Error), 1);
    let stats = log.stats();
    assert_eq!(stats.items_rejected, 1);
    // The rejected item went back to the pool too
    assert_eq!(stats.pool_returns + stats.items_destroyed, 3);
}

#[test]
fn test_full_queue_drops_newest() {
    let config = SharedLogConfig {
        queue_capacity: 2,
        ..SharedLogConfig::with_max_threads(1)
    };
    let (log, mut dispatcher, txt, _) = pipeline(config);
    let available = log.pool_available();

    log.log_str(Client::Txt, "one");
    log.log_str(Client::Txt, "two");
    log.log_str(Client::Txt, "three");

    let stats = log.stats();
    assert_eq!(stats.items_enqueued, 2);
    assert_eq!(stats.items_dropped, 1);

    let report = dispatcher.drain();
    assert_eq!(report.dispatched, 2);
    assert_eq!(*txt.lock().unwrap(), vec!["one", "two"]);

    // Nothing leaked: every item is back in the pool
    assert_eq!(log.pool_available(), available);
}

#[test]
fn test_shutdown_delivers_everything_queued() {
    let (log, dispatcher, txt, _) = pipeline(SharedLogConfig::with_max_threads(2));
    let mut scheduler = FlushScheduler::new(dispatcher, Duration::from_secs(3600));
    scheduler.start();

    let available = log.pool_available();
    for i in 0..50 {
        log.log_fmt(Client::Txt, format_args!("queued {}", i));
    }
    assert_eq!(log.queued(), 50);

    let report = scheduler.shutdown();
    assert_eq!(report.dispatched, 50);
    assert_eq!(txt.lock().unwrap().len(), 50);
    assert_eq!(log.queued(), 0);
    assert!(log.registry().is_empty());

    let stats = log.stats();
    assert_eq!(stats.items_acquired(), 50);
    assert_eq!(stats.pool_returns + stats.items_destroyed, 50);
    assert_eq!(log.pool_available(), available);
}

#[test]
fn test_no_registration_after_shutdown() {
    let (log, dispatcher, _, _) = pipeline(SharedLogConfig::with_max_threads(2));
    FlushScheduler::new(dispatcher, Duration::from_secs(3600)).shutdown();
    assert!(log.registry().is_empty());

    // A fresh thread and the already-known main thread keep producing
    let late = log.clone();
    thread::spawn(move || {
        let item = late.get_item(Client::Txt.id());
        late.submit(item);
    })
    .join()
    .unwrap();
    log.log_str(Client::Txt, "after shutdown");

    assert!(log.registry().is_empty());
    assert_eq!(log.queued(), 0);
    assert_eq!(log.stats().items_dropped, 2);
}

#[test]
fn test_shutdown_under_load_strands_nothing() {
    let (log, dispatcher, txt, _) = pipeline(SharedLogConfig::with_max_threads(4));
    let mut scheduler = FlushScheduler::new(dispatcher, Duration::from_secs(3600));
    scheduler.start();

    let stop = Arc::new(AtomicBool::new(false));
    let producers: Vec<_> = (0..4)
        .map(|t| {
            let log = log.clone();
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut i = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    log.log_fmt(Client::Txt, format_args!("t{} {}", t, i));
                    i += 1;
                }
            })
        })
        .collect();

    // Let the producers fill the queue, then shut down underneath them
    thread::sleep(Duration::from_millis(20));
    let report = scheduler.shutdown();
    thread::sleep(Duration::from_millis(5));
    stop.store(true, Ordering::Relaxed);
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(log.queued(), 0);
    assert!(log.registry().is_empty());

    // Every acquired item was delivered or recycled, none is left behind
    let stats = log.stats();
    assert_eq!(txt.lock().unwrap().len(), report.dispatched);
    assert_eq!(stats.items_dispatched + stats.items_dropped, stats.items_acquired());
    assert_eq!(
        stats.pool_returns + stats.items_destroyed,
        stats.items_acquired()
    );
}

#[test]
fn test_independent_pipelines() {
    let (log_a, mut dispatcher_a, txt_a, _) = pipeline(SharedLogConfig::with_max_threads(1));
    let (log_b, mut dispatcher_b, txt_b, _) = pipeline(SharedLogConfig::with_max_threads(1));

    log_a.log_str(Client::Txt, "a");
    log_b.log_str(Client::Txt, "b");

    dispatcher_a.drain();
    dispatcher_b.drain();
    assert_eq!(*txt_a.lock().unwrap(), vec!["a"]);
    assert_eq!(*txt_b.lock().unwrap(), vec!["b"]);
}

#[test]
fn test_start_time_accessors() {
    let (log, _dispatcher, _, _) = pipeline(SharedLogConfig::with_max_threads(1));
    assert_eq!(log.start_time_sec(), log.start_time().timestamp());
    thread::sleep(Duration::from_millis(5));
    assert!(log.elapsed_time_since_start() >= Duration::from_millis(5));
}

#[tokio::test]
async fn test_log_system_end_to_end() {
    let (sinks, txt, msc) = capture_sinks();
    let config = quiet(SharedLogConfig {
        flush_period_ms: 5,
        ..SharedLogConfig::with_max_threads(3)
    });
    let system = LogSystem::start(&config, sinks).unwrap();

    let producers: Vec<_> = (0..2)
        .map(|t| {
            let log = system.logger();
            thread::spawn(move || {
                for i in 0..100 {
                    log.log_fmt(Client::Txt, format_args!("p{} {}", t, i));
                }
                log.log_str(Client::Msc, "done");
            })
        })
        .collect();
    tokio::task::spawn_blocking(move || {
        for producer in producers {
            producer.join().unwrap();
        }
    })
    .await
    .unwrap();

    let log = system.logger();
    system.shutdown().await;

    assert_eq!(txt.lock().unwrap().len(), 200);
    assert_eq!(*msc.lock().unwrap(), vec!["done", "done"]);
    let stats = log.stats();
    assert_eq!(stats.items_dispatched, 202);
    assert_eq!(stats.items_dropped, 0);
}
