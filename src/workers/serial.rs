// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Input worker reading text frames from a serial-attached device.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::time::Duration;

use crate::config::{ConnectorSettings, Point, PointValue, SerialSettings};
use crate::errors::{DriverError, SettingInvalid, WorkerError};
use crate::observability::messages::worker::FieldUndecodable;
use crate::observability::messages::StructuredLog;
use crate::traits::{DriverFactory, InputWorker, SerialDevice, Worker};
use crate::workers::core::{WorkerConf, WorkerCore};

pub struct SerialWorker {
    core: WorkerCore,
    columns: Vec<String>,
    points: IndexMap<String, Point>,
    serial_test: IndexMap<String, String>,
    timeout: Duration,
    device: Box<dyn SerialDevice>,
}

impl SerialWorker {
    /// Build from resolved connector settings, opening nothing yet.
    pub fn from_settings(
        conf: &WorkerConf,
        settings: &ConnectorSettings,
        factory: &dyn DriverFactory,
    ) -> Result<Self, WorkerError> {
        let settings = settings.without_transient();
        let serial = settings
            .as_serial()
            .ok_or_else(|| SettingInvalid::new(conf.source_ref.source.as_str(), "not a serial connector"))?;
        let device = factory.serial(serial);
        Self::with_driver(conf, serial, device)
    }

    /// Build around an already-constructed device handle.
    pub fn with_driver(
        conf: &WorkerConf,
        settings: &SerialSettings,
        device: Box<dyn SerialDevice>,
    ) -> Result<Self, WorkerError> {
        if settings.serial_test.is_empty() {
            return Err(SettingInvalid::new("serial_test", "at least one identity field is required").into());
        }
        if settings.timeout == 0 {
            return Err(SettingInvalid::new("timeout", "must be a positive integer").into());
        }
        Ok(Self {
            core: WorkerCore::set_conf(conf)?,
            columns: conf.input_columns(),
            points: conf.points.clone(),
            serial_test: settings.serial_test.clone(),
            timeout: Duration::from_secs(settings.timeout),
            device,
        })
    }

    /// Swap the device handle. The worker is not ready until the next probe.
    pub fn set_worker(&mut self, device: Box<dyn SerialDevice>) {
        self.device = device;
        self.core.set_status(false);
    }

    fn check_identity(&self, fields: &IndexMap<String, String>) -> Result<(), DriverError> {
        for (field, expected) in &self.serial_test {
            let found = fields.get(field).map(|f| f.trim()).unwrap_or_default();
            if !found.eq_ignore_ascii_case(expected.trim()) {
                return Err(DriverError::IdentityMismatch {
                    field: field.clone(),
                    expected: expected.clone(),
                    found: found.to_string(),
                });
            }
        }
        Ok(())
    }

    fn decode_frame(&self, frame: &IndexMap<String, String>) -> IndexMap<String, PointValue> {
        let mut values = IndexMap::new();
        for column in &self.columns {
            let (Some(raw), Some(point)) = (frame.get(column), self.points.get(column)) else {
                continue;
            };
            match point.decode(raw) {
                Some(value) => {
                    values.insert(column.clone(), value);
                }
                None => FieldUndecodable {
                    worker: &self.core.name,
                    column,
                    raw,
                }
                .log(),
            }
        }
        values
    }
}

#[async_trait]
impl Worker for SerialWorker {
    fn core(&self) -> &WorkerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WorkerCore {
        &mut self.core
    }

    async fn probe(&mut self) -> Result<(), WorkerError> {
        let fields = match tokio::time::timeout(self.timeout, self.device.identify()).await {
            Ok(Ok(fields)) => fields,
            Ok(Err(e)) => return Err(self.core.unavailable(e)),
            Err(_) => return Err(self.core.timed_out(self.timeout)),
        };
        self.check_identity(&fields).map_err(|e| self.core.unavailable(e))
    }
}

#[async_trait]
impl InputWorker for SerialWorker {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn read_timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&mut self, timeout: Duration) -> Result<IndexMap<String, PointValue>, WorkerError> {
        let frame = match tokio::time::timeout(timeout, self.device.read_frame()).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => return Err(self.core.driver_failure(e)),
            Err(_) => return Err(self.core.timed_out(timeout)),
        };
        let _guard = self.core.span().clone().entered();
        Ok(self.decode_frame(&frame))
    }
}
