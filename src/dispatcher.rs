// SPDX-License-Identifier: Apache-2.0 OR MIT
// Flush dispatcher - drains the queue and routes records to sinks

use crate::client::{Client, MIN_CLIENT};
use crate::item::LogItem;
use crate::shared::{Shared, SharedLog};
use crate::sink::SinkTable;
use crate::stats;

const COMPONENT: &str = "dispatcher";

/// Outcome of one [`Dispatcher::drain`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records handed to a sink
    pub dispatched: usize,
    /// Records with an unknown client id or no installed sink
    pub rejected: usize,
}

impl DrainReport {
    /// Records popped from the queue
    pub fn total(&self) -> usize {
        self.dispatched + self.rejected
    }
}

impl std::ops::AddAssign for DrainReport {
    fn add_assign(&mut self, other: Self) {
        self.dispatched += other.dispatched;
        self.rejected += other.rejected;
    }
}

/// Single consumer of the message queue.
///
/// Owns the sink table; there is exactly one dispatcher per [`SharedLog`]
/// instance, which is what makes it the queue's only reader.
pub struct Dispatcher {
    log: SharedLog,
    sinks: SinkTable,
    touched: Vec<bool>,
}

impl Dispatcher {
    pub(crate) fn new(log: SharedLog, sinks: SinkTable) -> Self {
        let touched = vec![false; sinks.len()];
        Self {
            log,
            sinks,
            touched,
        }
    }

    /// Pop every currently queued record and route it.
    ///
    /// Stops at the first empty pop; never waits for more records. Each
    /// record is returned to the pool after its sink call, valid or not.
    pub fn drain(&mut self) -> DrainReport {
        let shared = self.log.inner();
        shared.registry.ensure_registered();

        let mut report = DrainReport::default();
        while let Some(item) = shared.queue.try_pop() {
            if route(shared, &mut self.sinks, &mut self.touched, &item) {
                report.dispatched += 1;
            } else {
                report.rejected += 1;
            }
            shared.pool.release(item);
        }

        if report.dispatched > 0 {
            self.sinks.flush_touched(&self.touched);
            self.touched.iter_mut().for_each(|t| *t = false);
        }
        stats::publish_queue(
            shared.queue.len(),
            shared.queue.overruns(),
            shared.queue.cas_failures(),
        );
        report
    }

    /// Producer handle for the pipeline this dispatcher drains
    pub fn shared_log(&self) -> &SharedLog {
        &self.log
    }

    /// Records waiting in the queue
    pub fn pending(&self) -> usize {
        self.log.inner().queue.len()
    }
}

impl Drop for Dispatcher {
    // Late producers wait for `finish` once the pipeline is closed; make sure
    // they are released even if shutdown unwound before getting there.
    fn drop(&mut self) {
        if self.log.is_closed() && !self.log.is_finished() {
            self.log.finish();
        }
    }
}

/// Hand one record to its sink; false if it had to be rejected
fn route(shared: &Shared, sinks: &mut SinkTable, touched: &mut [bool], item: &LogItem) -> bool {
    let client_id = item.client_id();

    if !Client::is_valid_id(client_id) {
        shared.stats.record_rejected();
        diag_error!(shared.diag, COMPONENT, "bad logger identifier: {}", client_id);
        return false;
    }

    match sinks.get_mut(client_id) {
        Some(sink) => {
            sink.write_item(item);
            touched[(client_id - MIN_CLIENT) as usize] = true;
            shared.stats.record_dispatched();
            true
        }
        None => {
            shared.stats.record_rejected();
            diag_error!(
                shared.diag,
                COMPONENT,
                "no sink installed for logger identifier: {}",
                client_id
            );
            false
        }
    }
}
