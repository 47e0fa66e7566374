// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Wiring for async applications
//!
//! [`LogSystem`] builds a pipeline and spawns its [`FlushScheduler`] on the
//! current tokio runtime, so callers only deal with a producer handle and
//! an async shutdown.

use crate::config::SharedLogConfig;
use crate::dispatcher::DrainReport;
use crate::error::InitError;
use crate::scheduler::{FlushScheduler, SchedulerHandle, Signal};
use crate::shared::SharedLog;
use crate::sink::SinkTable;
use crate::stats::StatsSnapshot;

const COMPONENT: &str = "log_system";

/// A running pipeline: producer handle plus the spawned scheduler
pub struct LogSystem {
    log: SharedLog,
    scheduler: SchedulerHandle,
}

impl LogSystem {
    /// Initialize a pipeline and start its flush timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &SharedLogConfig, sinks: SinkTable) -> Result<Self, InitError> {
        let (log, dispatcher) = SharedLog::init(config, sinks)?;
        let scheduler = FlushScheduler::new(dispatcher, config.flush_period()).spawn();
        Ok(Self { log, scheduler })
    }

    /// Producer handle; clone it into as many threads as needed
    pub fn logger(&self) -> SharedLog {
        self.log.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.log.stats()
    }

    /// Request an immediate drain cycle
    pub async fn flush(&self) -> bool {
        self.scheduler.flush_now().await
    }

    /// Forward an arbitrary signal to the scheduler
    pub async fn signal(&self, signal: Signal) -> bool {
        self.scheduler.send(signal).await
    }

    /// Terminate the scheduler and wait for the final drain.
    ///
    /// Records submitted after this returns are dropped and recycled.
    pub async fn shutdown(self) -> DrainReport {
        let log = self.log;
        match self.scheduler.shutdown().await {
            Ok(report) => report,
            Err(e) => {
                diag_error!(
                    log.diagnostics(),
                    COMPONENT,
                    "Flush scheduler task failed: {}",
                    e
                );
                DrainReport::default()
            }
        }
    }
}
