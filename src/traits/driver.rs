// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Seams to the external collaborators: the serial frame decoder, the cache
//! store client and the telemetry HTTP clients.
//!
//! Workers own one driver handle each for their whole lifetime. Handles are
//! created without I/O; the first readiness probe opens the underlying
//! line or connection, and dropping the handle releases it.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::config::{CacheStoreSettings, ConnectorKind, HttpSettings, Point, PointValue, SerialSettings, SourceRef};
use crate::errors::DriverError;
use crate::workers::batch::Batch;

/// Device-specific discriminators of a source ref, handed to drivers on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub source: String,
    pub material: Option<String>,
    pub redis_node: Option<String>,
    pub db: Option<String>,
    pub measurement: Option<String>,
}

impl From<&SourceRef> for Target {
    fn from(source_ref: &SourceRef) -> Self {
        Self {
            source: source_ref.source.clone(),
            material: source_ref.material.clone(),
            redis_node: source_ref.redis_node.clone(),
            db: source_ref.db.clone(),
            measurement: source_ref.measurement.clone(),
        }
    }
}

/// A serial-attached energy device.
#[async_trait]
pub trait SerialDevice: Send + Sync {
    /// Open the line if needed and report the device's identity fields.
    async fn identify(&mut self) -> Result<IndexMap<String, String>, DriverError>;

    /// Read the next complete frame as raw `label -> text` fields.
    async fn read_frame(&mut self) -> Result<IndexMap<String, String>, DriverError>;
}

/// An in-memory cache store reachable over the network.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn ping(&mut self) -> Result<(), DriverError>;

    /// Latest values of `columns` stored under `target`.
    async fn read(&mut self, target: &Target, columns: &[String]) -> Result<IndexMap<String, PointValue>, DriverError>;

    async fn write(&mut self, target: &Target, batch: &Batch) -> Result<(), DriverError>;
}

/// A time-series store or telemetry endpoint spoken to over HTTP.
#[async_trait]
pub trait TelemetryClient: Send + Sync {
    async fn ping(&mut self) -> Result<(), DriverError>;

    async fn send(
        &mut self,
        target: &Target,
        batch: &Batch,
        input_structure: &IndexMap<String, Point>,
    ) -> Result<(), DriverError>;
}

/// Builds driver handles from resolved connector settings.
pub trait DriverFactory: Send + Sync {
    fn serial(&self, settings: &SerialSettings) -> Box<dyn SerialDevice>;

    fn cache_store(&self, settings: &CacheStoreSettings) -> Box<dyn CacheStore>;

    fn telemetry(&self, kind: ConnectorKind, settings: &HttpSettings) -> Box<dyn TelemetryClient>;
}
