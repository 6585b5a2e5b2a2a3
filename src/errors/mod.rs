// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for every vemonitor subsystem.
//!
//! Loader and validator errors are fatal at startup. Worker errors are
//! recoverable: the worker stays registered with `status = false` and is
//! re-probed on the next scheduler tick.

mod config;
mod schema;
mod worker;

pub use config::{ConfigError, MissingPointError, SettingInvalid};
pub use schema::{SchemaError, ValidationError};
pub use worker::{DriverError, WorkerError};

use thiserror::Error;

/// Catch-all error for unrecoverable kernel failures.
#[derive(Error, Debug)]
pub enum VeMonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    SettingInvalid(#[from] SettingInvalid),

    #[error(transparent)]
    MissingPoint(#[from] MissingPointError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("vemonitor failure: {0}")]
    Kernel(String),
}

pub type VeMonitorResult<T> = Result<T, VeMonitorError>;
