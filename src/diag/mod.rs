// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Self-diagnostics for the pipeline.
//!
//! The pipeline cannot log through itself (a failing drain would recurse), so
//! its own reports go straight to stderr as one JSON object per line. Every
//! report is counted per severity whether or not it passes the level filter,
//! which lets callers and tests observe e.g. rejected client ids.

#[macro_use]
mod macros;
mod severity;

pub use severity::Severity;

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Level-filtered stderr JSON reporter
#[derive(Debug)]
pub struct Diagnostics {
    min_level: AtomicU8,
    counts: [AtomicU64; Severity::COUNT],
}

impl Diagnostics {
    pub fn new(min_level: Severity) -> Self {
        Self {
            min_level: AtomicU8::new(min_level.as_u8()),
            counts: Default::default(),
        }
    }

    /// Check if a report at `severity` should be written
    #[inline]
    pub fn should_log(&self, severity: Severity) -> bool {
        severity.as_u8() <= self.min_level.load(Ordering::Relaxed)
    }

    /// Set the minimum level written to stderr
    pub fn set_level(&self, level: Severity) {
        self.min_level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn level(&self) -> Severity {
        Severity::from_u8(self.min_level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Write one report (use the `diag_*!` macros instead of calling directly)
    pub fn report(&self, severity: Severity, component: &str, message: &str) {
        self.count(severity);
        if self.should_log(severity) {
            eprintln!("{}", render(severity, component, message));
        }
    }

    #[doc(hidden)]
    #[inline]
    pub fn count(&self, severity: Severity) {
        self.counts[severity.as_u8() as usize].fetch_add(1, Ordering::Relaxed);
    }

    /// Number of reports raised at exactly `severity`
    pub fn reported(&self, severity: Severity) -> u64 {
        self.counts[severity.as_u8() as usize].load(Ordering::Relaxed)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}

fn render(severity: Severity, component: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "level": severity.as_str(),
        "component": component,
        "message": message,
    })
}
