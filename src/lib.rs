// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Asynchronous, thread-safe log-record pipeline.
//!
//! Producer threads take a [`LogItem`] from a recycling pool, fill it and
//! [`SharedLog::submit`] it onto a bounded lock-free queue. A single
//! [`FlushScheduler`] task wakes on a fixed cadence, drains the queue through
//! the [`Dispatcher`] and hands each record to the [`LogSink`] registered for
//! its client id. Nothing on the producer side blocks: an exhausted pool
//! allocates, a full queue drops.

#[macro_use]
pub mod diag;

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod integration;
pub mod item;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod shared;
pub mod sink;
pub mod stats;

pub use client::{Client, ClientId, MAX_CLIENT, MIN_CLIENT};
pub use config::SharedLogConfig;
pub use diag::{Diagnostics, Severity};
pub use dispatcher::{Dispatcher, DrainReport};
pub use error::{ConfigError, InitError};
pub use integration::LogSystem;
pub use item::LogItem;
pub use pool::ItemPool;
pub use queue::MessageQueue;
pub use registry::{ThreadContext, ThreadRegistry};
pub use scheduler::{FlushScheduler, SchedulerHandle, SchedulerState, Signal, Transition};
pub use shared::SharedLog;
pub use sink::{FileSink, LogSink, SinkTable, StderrSink, StdoutSink};
pub use stats::{PipelineStats, StatsSnapshot};
