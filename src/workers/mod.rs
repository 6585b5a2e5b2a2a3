// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Worker kernel: the concrete input and output workers, their shared
//! core, request pacing and the kind-keyed constructor registry.
//!
//! | kind | input | output |
//! |---|---|---|
//! | `serial` | [`SerialWorker`] | |
//! | `redis` | [`CacheStoreInput`] | [`CacheStoreOutput`] |
//! | `influxDb2`, `emoncms` | | [`HttpTelemetryWorker`] |

pub mod batch;
pub mod cache_store;
pub mod core;
pub mod factory;
pub mod http_telemetry;
pub mod pacing;
pub mod registry;
pub mod serial;
#[cfg(test)]
pub mod stub;

pub use batch::{Batch, BatchRow, Projection};
pub use cache_store::{CacheStoreInput, CacheStoreOutput};
pub use self::core::{worker_name, Direction, WorkerConf, WorkerCore};
pub use factory::{InputConstructor, OutputConstructor, UnlinkedDrivers, WorkerRegistry};
pub use http_telemetry::HttpTelemetryWorker;
pub use pacing::OutputSchedule;
pub use registry::{ActiveConnectors, BoundConnector, Workers, WorkersDict};
pub use serial::SerialWorker;
