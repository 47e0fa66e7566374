// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Flush scheduler
//!
//! Drives the [`Dispatcher`] on a fixed cadence and owns the shutdown path.
//!
//! ```text
//! Init -> Armed -> Draining -> Armed -> ...      (TimerExpired)
//! Armed/Draining -> ShuttingDown -> Terminated  (Terminate)
//! ```
//!
//! The state machine itself is synchronous ([`FlushScheduler::handle`]);
//! [`FlushScheduler::run`] feeds it from a one-shot tokio timer that is
//! re-armed after every drain, plus an inbound signal channel.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use crate::dispatcher::{Dispatcher, DrainReport};
use crate::shared::SharedLog;

const COMPONENT: &str = "scheduler";

/// Capacity of the inbound signal channel
pub const SIGNAL_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Init,
    Armed,
    Draining,
    ShuttingDown,
    Terminated,
}

/// Inbound scheduler signals
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Run one drain cycle and re-arm
    TimerExpired,
    /// Final drain, teardown, exit
    Terminate,
    /// Anything else; ignored
    Other(&'static str),
}

/// What the driver should do after a signal was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Re-arm the one-shot timer for another period
    Rearm,
    /// Keep the current timer
    Ignored,
    /// Scheduler is terminated; stop driving it
    Exit,
}

/// The single consumer task of a pipeline
pub struct FlushScheduler {
    dispatcher: Dispatcher,
    period: Duration,
    state: SchedulerState,
    cycles: u64,
    delivered: DrainReport,
    final_drain: Option<DrainReport>,
}

impl FlushScheduler {
    pub fn new(dispatcher: Dispatcher, period: Duration) -> Self {
        Self {
            dispatcher,
            period,
            state: SchedulerState::Init,
            cycles: 0,
            delivered: DrainReport::default(),
            final_drain: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Completed periodic drain cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Totals over every drain so far, the final one included
    pub fn delivered(&self) -> DrainReport {
        self.delivered
    }

    pub fn shared_log(&self) -> &SharedLog {
        self.dispatcher.shared_log()
    }

    /// Register the scheduler thread and move Init -> Armed
    pub fn start(&mut self) {
        if self.state != SchedulerState::Init {
            return;
        }
        let log = self.dispatcher.shared_log();
        log.ensure_registered();
        self.state = SchedulerState::Armed;
        diag_debug!(
            log.diagnostics(),
            COMPONENT,
            "Flush timer armed, period {:?}",
            self.period
        );
    }

    /// Apply one signal to the state machine
    pub fn handle(&mut self, signal: Signal) -> Transition {
        if self.state == SchedulerState::Terminated {
            return Transition::Exit;
        }
        match signal {
            Signal::TimerExpired => {
                self.flush_cycle();
                Transition::Rearm
            }
            Signal::Terminate => {
                self.terminate();
                Transition::Exit
            }
            Signal::Other(kind) => {
                diag_debug!(
                    self.dispatcher.shared_log().diagnostics(),
                    COMPONENT,
                    "Ignoring signal {}",
                    kind
                );
                Transition::Ignored
            }
        }
    }

    fn flush_cycle(&mut self) -> DrainReport {
        self.state = SchedulerState::Draining;
        let report = self.dispatcher.drain();
        self.delivered += report;
        self.cycles += 1;
        self.state = SchedulerState::Armed;
        report
    }

    fn terminate(&mut self) -> DrainReport {
        self.state = SchedulerState::ShuttingDown;
        let log = self.dispatcher.shared_log().clone();
        diag_info!(log.diagnostics(), COMPONENT, "Entering shutdown");

        log.close();
        let report = self.dispatcher.drain();
        self.delivered += report;
        let late = log.finish();
        let released = log.registry().teardown();

        self.final_drain = Some(report);
        self.state = SchedulerState::Terminated;
        diag_info!(
            log.diagnostics(),
            COMPONENT,
            "Leaving shutdown: {} records flushed, {} late records recycled, {} thread contexts released",
            report.total(),
            late,
            released
        );
        report
    }

    /// Run the termination path inline; returns the final drain.
    pub fn shutdown(mut self) -> DrainReport {
        if self.state == SchedulerState::Terminated {
            return self.final_drain.unwrap_or_default();
        }
        self.terminate()
    }

    /// Drive the scheduler until `Terminate` arrives or every sender is gone.
    ///
    /// Returns the report of the final drain.
    pub async fn run(mut self, mut signals: mpsc::Receiver<Signal>) -> DrainReport {
        self.start();

        let timer = tokio::time::sleep(self.period);
        tokio::pin!(timer);

        loop {
            let transition = tokio::select! {
                _ = &mut timer => self.handle(Signal::TimerExpired),
                signal = signals.recv() => match signal {
                    Some(signal) => self.handle(signal),
                    // Nobody can reach us anymore
                    None => self.handle(Signal::Terminate),
                },
            };

            match transition {
                Transition::Rearm => timer.as_mut().reset(Instant::now() + self.period),
                Transition::Ignored => {}
                Transition::Exit => break,
            }
        }

        // Dropping the pinned timer cancels it
        self.final_drain.unwrap_or_default()
    }

    /// Spawn [`run`](Self::run) on the current tokio runtime
    pub fn spawn(self) -> SchedulerHandle {
        let (signals, rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        let task = tokio::spawn(self.run(rx));
        SchedulerHandle { signals, task }
    }
}

/// Handle to a spawned scheduler task
pub struct SchedulerHandle {
    signals: mpsc::Sender<Signal>,
    task: JoinHandle<DrainReport>,
}

impl SchedulerHandle {
    /// Deliver one signal; false if the task has already exited
    pub async fn send(&self, signal: Signal) -> bool {
        self.signals.send(signal).await.is_ok()
    }

    /// Force a drain cycle now (also restarts the period)
    pub async fn flush_now(&self) -> bool {
        self.send(Signal::TimerExpired).await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Send `Terminate` and wait for the final drain
    pub async fn shutdown(self) -> Result<DrainReport, JoinError> {
        let _ = self.signals.send(Signal::Terminate).await;
        self.task.await
    }
}
