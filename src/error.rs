// SPDX-License-Identifier: Apache-2.0 OR MIT
// Error types for configuration and initialization

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    IoError(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Config field '{field}' must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error(
        "max_retained_capacity ({max_retained}) must not be smaller than message_min_alloc_size ({min_alloc})"
    )]
    RetainedBelowMinimum { max_retained: usize, min_alloc: usize },
}

/// Errors returned by [`SharedLog::init`](crate::SharedLog::init)
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Invalid shared log configuration: {0}")]
    Config(#[from] ConfigError),
}
