// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Property tests: queue ordering and drop accounting
//!
//! Random interleavings of submits and drains against small queues. Whatever
//! the sequence, delivered records are exactly the accepted ones, in submit
//! order, and every acquired item ends up back in the pool or destroyed.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shared_log::{Client, LogItem, LogSink, Severity, SharedLog, SharedLogConfig, SinkTable};
    use std::sync::{Arc, Mutex};

    struct CaptureSink {
        records: Arc<Mutex<Vec<String>>>,
    }

    impl LogSink for CaptureSink {
        fn write_item(&mut self, item: &LogItem) {
            self.records.lock().unwrap().push(item.as_str().to_owned());
        }

        fn flush(&mut self) {}
    }

    #[derive(Debug, Clone)]
    enum Op {
        Submit,
        Drain,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![3 => Just(Op::Submit), 1 => Just(Op::Drain)]
    }

    proptest! {
        /// **Property:** one drain after `n` submits delivers the first
        /// `min(n, capacity)` records in order and drops the rest.
        #[test]
        fn test_single_drain_delivers_prefix(capacity in 1usize..16, n in 0usize..48) {
            let records = Arc::new(Mutex::new(Vec::new()));
            let sinks = SinkTable::new().with_sink(
                Client::Txt,
                Box::new(CaptureSink { records: Arc::clone(&records) }),
            );
            let config = SharedLogConfig {
                queue_capacity: capacity,
                diag_level: Severity::Emergency,
                ..SharedLogConfig::with_max_threads(1)
            };
            let (log, mut dispatcher) = SharedLog::init(&config, sinks).unwrap();

            for i in 0..n {
                log.log_fmt(Client::Txt, format_args!("{}", i));
            }
            let report = dispatcher.drain();

            let accepted = n.min(capacity);
            prop_assert_eq!(report.dispatched, accepted);
            let expected: Vec<String> = (0..accepted).map(|i| i.to_string()).collect();
            prop_assert_eq!(&*records.lock().unwrap(), &expected);

            let stats = log.stats();
            prop_assert_eq!(stats.items_dropped as usize, n - accepted);
            prop_assert_eq!(stats.items_acquired() as usize, n);
            prop_assert_eq!((stats.pool_returns + stats.items_destroyed) as usize, n);
        }

        /// **Property:** under any submit/drain interleaving, the delivered
        /// sequence is the submitted sequence minus the dropped records.
        #[test]
        fn test_interleaved_ops_preserve_order(
            capacity in 1usize..8,
            ops in proptest::collection::vec(op(), 0..96),
        ) {
            let records = Arc::new(Mutex::new(Vec::new()));
            let sinks = SinkTable::new().with_sink(
                Client::Txt,
                Box::new(CaptureSink { records: Arc::clone(&records) }),
            );
            let config = SharedLogConfig {
                queue_capacity: capacity,
                diag_level: Severity::Emergency,
                ..SharedLogConfig::with_max_threads(1)
            };
            let (log, mut dispatcher) = SharedLog::init(&config, sinks).unwrap();

            let mut expected = Vec::new();
            let mut pending = 0usize;
            let mut submitted = 0usize;
            for op in ops {
                match op {
                    Op::Submit => {
                        let tag = submitted.to_string();
                        submitted += 1;
                        log.log_str(Client::Txt, &tag);
                        if pending < capacity {
                            pending += 1;
                            expected.push(tag);
                        }
                    }
                    Op::Drain => {
                        prop_assert_eq!(dispatcher.drain().dispatched, pending);
                        pending = 0;
                    }
                }
            }
            dispatcher.drain();

            prop_assert_eq!(&*records.lock().unwrap(), &expected);
            let stats = log.stats();
            prop_assert_eq!(stats.items_dispatched as usize, expected.len());
            prop_assert_eq!(stats.items_dropped as usize, submitted - expected.len());
        }
    }
}
