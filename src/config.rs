// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Configuration for the shared log pipeline.
//!
//! JSON5 file format (comments and trailing commas allowed). Every key is
//! optional; missing keys take the defaults below.
//!
//! ```json5
//! {
//!     max_threads: 8,          // sizes the item pool
//!     queue_capacity: 1024,    // slots in the hand-off queue
//!     flush_period_ms: 50,
//!     diag_level: "warning",
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::diag::Severity;
pub use crate::error::ConfigError;
use crate::item::LOG_MESSAGE_MIN_ALLOC_SIZE;

/// Default number of producer threads the pool is sized for
pub const DEFAULT_MAX_THREADS: usize = 16;
/// Items pre-seeded into the pool per expected thread
pub const ITEMS_PER_THREAD: usize = 30;
/// Slots in the hand-off queue
pub const LOG_MAX_QUEUE_ELEMENTS: usize = 1024;
/// Default flush cadence
pub const LOG_FLUSH_PERIOD: Duration = Duration::from_millis(50);
/// Buffers larger than this are shrunk when returned to the pool
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SharedLogConfig {
    /// Expected number of producer threads
    pub max_threads: usize,

    /// Items pre-allocated per expected thread
    pub items_per_thread: usize,

    /// Hand-off queue capacity; submits beyond it are dropped
    pub queue_capacity: usize,

    /// Flush cadence in milliseconds
    pub flush_period_ms: u64,

    /// Initial capacity of a freshly allocated record buffer
    pub message_min_alloc_size: usize,

    /// Record buffers above this capacity are shrunk on recycle
    pub max_retained_capacity: usize,

    /// Minimum level of the pipeline's own stderr diagnostics
    pub diag_level: Severity,
}

impl Default for SharedLogConfig {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            items_per_thread: ITEMS_PER_THREAD,
            queue_capacity: LOG_MAX_QUEUE_ELEMENTS,
            flush_period_ms: LOG_FLUSH_PERIOD.as_millis() as u64,
            message_min_alloc_size: LOG_MESSAGE_MIN_ALLOC_SIZE,
            max_retained_capacity: DEFAULT_MAX_RETAINED_CAPACITY,
            diag_level: Severity::Info,
        }
    }
}

impl SharedLogConfig {
    /// Default configuration sized for `max_threads` producers
    pub fn with_max_threads(max_threads: usize) -> Self {
        Self {
            max_threads,
            ..Self::default()
        }
    }

    /// Load configuration from a JSON5 file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("max_threads", self.max_threads as u64),
            ("items_per_thread", self.items_per_thread as u64),
            ("queue_capacity", self.queue_capacity as u64),
            ("flush_period_ms", self.flush_period_ms),
            ("message_min_alloc_size", self.message_min_alloc_size as u64),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::ZeroValue { field });
            }
        }

        if self.max_retained_capacity < self.message_min_alloc_size {
            return Err(ConfigError::RetainedBelowMinimum {
                max_retained: self.max_retained_capacity,
                min_alloc: self.message_min_alloc_size,
            });
        }

        Ok(())
    }

    /// Flush cadence as a Duration
    pub fn flush_period(&self) -> Duration {
        Duration::from_millis(self.flush_period_ms)
    }

    /// Items seeded into the pool at init
    pub fn pool_prefill(&self) -> usize {
        self.max_threads.saturating_mul(self.items_per_thread)
    }
}
