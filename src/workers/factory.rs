// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Worker constructors keyed by connector kind.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{
    CacheStoreSettings, ConnectorKind, ConnectorSettings, HttpSettings, Point, PointValue, SerialSettings,
};
use crate::errors::{DriverError, WorkerError};
use crate::traits::{CacheStore, DriverFactory, InputWorker, OutputWorker, SerialDevice, Target, TelemetryClient};
use crate::workers::batch::Batch;
use crate::workers::cache_store::{CacheStoreInput, CacheStoreOutput};
use crate::workers::core::{Direction, WorkerConf};
use crate::workers::http_telemetry::HttpTelemetryWorker;
use crate::workers::serial::SerialWorker;

pub type InputConstructor = Arc<
    dyn Fn(&WorkerConf, &ConnectorSettings, &dyn DriverFactory) -> Result<Box<dyn InputWorker>, WorkerError>
        + Send
        + Sync,
>;

pub type OutputConstructor = Arc<
    dyn Fn(&WorkerConf, &ConnectorSettings, &dyn DriverFactory) -> Result<Box<dyn OutputWorker>, WorkerError>
        + Send
        + Sync,
>;

/// Maps each connector kind to the constructors able to build its workers.
#[derive(Clone)]
pub struct WorkerRegistry {
    inputs: HashMap<ConnectorKind, InputConstructor>,
    outputs: HashMap<ConnectorKind, OutputConstructor>,
    drivers: Arc<dyn DriverFactory>,
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl WorkerRegistry {
    /// An empty registry. Every build fails with `UnsupportedKind` until constructors are registered.
    pub fn new(drivers: Arc<dyn DriverFactory>) -> Self {
        Self {
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            drivers,
        }
    }

    /// The bundled workers: serial and cache-store inputs, cache-store and HTTP outputs.
    pub fn with_defaults(drivers: Arc<dyn DriverFactory>) -> Self {
        let mut registry = Self::new(drivers);
        registry.register_input(ConnectorKind::Serial, |conf, settings, drivers| {
            Ok(Box::new(SerialWorker::from_settings(conf, settings, drivers)?))
        });
        registry.register_input(ConnectorKind::Redis, |conf, settings, drivers| {
            Ok(Box::new(CacheStoreInput::from_settings(conf, settings, drivers)?))
        });
        registry.register_output(ConnectorKind::Redis, |conf, settings, drivers| {
            Ok(Box::new(CacheStoreOutput::from_settings(conf, settings, drivers)?))
        });
        for kind in [ConnectorKind::InfluxDb2, ConnectorKind::Emoncms] {
            registry.register_output(kind, |conf, settings, drivers| {
                Ok(Box::new(HttpTelemetryWorker::from_settings(conf, settings, drivers)?))
            });
        }
        registry
    }

    pub fn register_input<F>(&mut self, kind: ConnectorKind, constructor: F)
    where
        F: Fn(&WorkerConf, &ConnectorSettings, &dyn DriverFactory) -> Result<Box<dyn InputWorker>, WorkerError>
            + Send
            + Sync
            + 'static,
    {
        self.inputs.insert(kind, Arc::new(constructor));
    }

    pub fn register_output<F>(&mut self, kind: ConnectorKind, constructor: F)
    where
        F: Fn(&WorkerConf, &ConnectorSettings, &dyn DriverFactory) -> Result<Box<dyn OutputWorker>, WorkerError>
            + Send
            + Sync
            + 'static,
    {
        self.outputs.insert(kind, Arc::new(constructor));
    }

    pub fn supports(&self, kind: ConnectorKind, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.inputs.contains_key(&kind),
            Direction::Output => self.outputs.contains_key(&kind),
        }
    }

    pub fn build_input(
        &self,
        conf: &WorkerConf,
        settings: &ConnectorSettings,
    ) -> Result<Box<dyn InputWorker>, WorkerError> {
        let constructor = self.inputs.get(&conf.kind).ok_or_else(|| WorkerError::UnsupportedKind {
            kind: conf.kind.to_string(),
            direction: Direction::Input.as_str(),
        })?;
        constructor(conf, settings, self.drivers.as_ref())
    }

    pub fn build_output(
        &self,
        conf: &WorkerConf,
        settings: &ConnectorSettings,
    ) -> Result<Box<dyn OutputWorker>, WorkerError> {
        let constructor = self.outputs.get(&conf.kind).ok_or_else(|| WorkerError::UnsupportedKind {
            kind: conf.kind.to_string(),
            direction: Direction::Output.as_str(),
        })?;
        constructor(conf, settings, self.drivers.as_ref())
    }
}

/// Driver factory for hosts that link no wire drivers. Every probe fails,
/// so bound workers stay registered and unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlinkedDrivers;

struct Unlinked(&'static str);

impl Unlinked {
    fn error(&self) -> DriverError {
        DriverError::Connection(format!("no {} driver is linked into this build", self.0))
    }
}

#[async_trait]
impl SerialDevice for Unlinked {
    async fn identify(&mut self) -> Result<IndexMap<String, String>, DriverError> {
        Err(self.error())
    }

    async fn read_frame(&mut self) -> Result<IndexMap<String, String>, DriverError> {
        Err(self.error())
    }
}

#[async_trait]
impl CacheStore for Unlinked {
    async fn ping(&mut self) -> Result<(), DriverError> {
        Err(self.error())
    }

    async fn read(&mut self, _target: &Target, _columns: &[String]) -> Result<IndexMap<String, PointValue>, DriverError> {
        Err(self.error())
    }

    async fn write(&mut self, _target: &Target, _batch: &Batch) -> Result<(), DriverError> {
        Err(self.error())
    }
}

#[async_trait]
impl TelemetryClient for Unlinked {
    async fn ping(&mut self) -> Result<(), DriverError> {
        Err(self.error())
    }

    async fn send(
        &mut self,
        _target: &Target,
        _batch: &Batch,
        _input_structure: &IndexMap<String, Point>,
    ) -> Result<(), DriverError> {
        Err(self.error())
    }
}

impl DriverFactory for UnlinkedDrivers {
    fn serial(&self, _settings: &SerialSettings) -> Box<dyn SerialDevice> {
        Box::new(Unlinked("serial"))
    }

    fn cache_store(&self, _settings: &CacheStoreSettings) -> Box<dyn CacheStore> {
        Box::new(Unlinked("cache store"))
    }

    fn telemetry(&self, kind: ConnectorKind, _settings: &HttpSettings) -> Box<dyn TelemetryClient> {
        Box::new(Unlinked(kind.as_str()))
    }
}
