// SPDX-License-Identifier: Apache-2.0 OR MIT
// Diagnostic levels, numbered like syslog (RFC 5424): 0 is the most severe

use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    /// Rejected records, registration failures
    Error = 3,
    /// Empty sink slots at init
    Warning = 4,
    Notice = 5,
    /// Init and shutdown milestones
    #[default]
    Info = 6,
    /// Pool overflow, ignored scheduler signals
    Debug = 7,
}

impl Severity {
    /// Every level, indexed by its numeric value
    pub const ALL: [Severity; 8] = [
        Severity::Emergency,
        Severity::Alert,
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Info,
        Severity::Debug,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Upper-case label used in the JSON `level` field
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Emergency => "EMERGENCY",
            Severity::Alert => "ALERT",
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Notice => "NOTICE",
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
