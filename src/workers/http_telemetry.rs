// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Output worker for time-series stores and telemetry endpoints reached over HTTP.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::config::{ConnectorSettings, Point};
use crate::errors::{SettingInvalid, WorkerError};
use crate::traits::{DriverFactory, OutputWorker, TelemetryClient, Worker};
use crate::workers::batch::{Batch, Projection};
use crate::workers::core::{WorkerConf, WorkerCore};
use crate::workers::pacing::OutputSchedule;

pub struct HttpTelemetryWorker {
    core: WorkerCore,
    projection: Projection,
    schedule: OutputSchedule,
    client: Box<dyn TelemetryClient>,
}

impl HttpTelemetryWorker {
    pub fn from_settings(
        conf: &WorkerConf,
        settings: &ConnectorSettings,
        factory: &dyn DriverFactory,
    ) -> Result<Self, WorkerError> {
        let settings = settings.without_transient();
        let http = settings
            .as_http()
            .ok_or_else(|| SettingInvalid::new(conf.source_ref.source.as_str(), "not an http connector"))?;
        if http.addr.trim().is_empty() {
            return Err(SettingInvalid::new("addr", "must not be empty").into());
        }
        if http.apikey.trim().is_empty() {
            return Err(SettingInvalid::new("apikey", "must not be empty").into());
        }
        let client = factory.telemetry(conf.kind, http);
        Self::with_driver(conf, client)
    }

    pub fn with_driver(conf: &WorkerConf, client: Box<dyn TelemetryClient>) -> Result<Self, WorkerError> {
        Ok(Self {
            core: WorkerCore::set_conf(conf)?,
            projection: conf.projection(),
            schedule: conf.schedule(),
            client,
        })
    }

    pub fn set_worker(&mut self, client: Box<dyn TelemetryClient>) {
        self.client = client;
        self.core.set_status(false);
    }
}

#[async_trait]
impl Worker for HttpTelemetryWorker {
    fn core(&self) -> &WorkerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WorkerCore {
        &mut self.core
    }

    async fn probe(&mut self) -> Result<(), WorkerError> {
        self.client.ping().await.map_err(|e| self.core.unavailable(e))
    }
}

#[async_trait]
impl OutputWorker for HttpTelemetryWorker {
    fn projection(&self) -> &Projection {
        &self.projection
    }

    fn schedule(&self) -> &OutputSchedule {
        &self.schedule
    }

    fn schedule_mut(&mut self) -> &mut OutputSchedule {
        &mut self.schedule
    }

    async fn transmit(&mut self, batch: &Batch, input_structure: &IndexMap<String, Point>) -> Result<(), WorkerError> {
        self.client
            .send(&self.core.target, batch, input_structure)
            .await
            .map_err(|e| self.core.driver_failure(e))
    }
}
