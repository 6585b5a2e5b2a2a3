// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;
use thiserror::Error;

use super::SettingInvalid;

/// Failure reported by an external driver (serial line, cache store, HTTP client).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("device identity mismatch on '{field}': expected {expected}, found {found}")]
    IdentityMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("driver I/O error: {0}")]
    Io(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Worker-level failures. All of them are recoverable.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Driver preflight failed; the worker is retried on every tick.
    #[error("worker '{name}' unavailable: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("worker '{name}' driver failure: {source}")]
    Driver {
        name: String,
        #[source]
        source: DriverError,
    },

    #[error("worker '{name}' timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    /// No constructor registered for this connector kind.
    #[error("no worker registered for kind '{kind}' ({direction})")]
    UnsupportedKind { kind: String, direction: &'static str },

    #[error(transparent)]
    SettingInvalid(#[from] SettingInvalid),
}
