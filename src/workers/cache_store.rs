// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Cache-store workers. The input side samples the latest stored values,
//! the output side writes batches under the ref's `redis_node`.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::time::Duration;

use crate::config::{CacheStoreSettings, ConnectorSettings, Point, PointValue};
use crate::errors::{SettingInvalid, WorkerError};
use crate::traits::{CacheStore, DriverFactory, InputWorker, OutputWorker, Worker};
use crate::workers::batch::{Batch, Projection};
use crate::workers::core::{WorkerConf, WorkerCore};
use crate::workers::pacing::OutputSchedule;

fn cache_settings(conf: &WorkerConf, settings: &ConnectorSettings) -> Result<CacheStoreSettings, SettingInvalid> {
    let settings = settings.without_transient();
    let store = settings
        .as_cache_store()
        .ok_or_else(|| SettingInvalid::new(conf.source_ref.source.as_str(), "not a cache store connector"))?;
    if store.host.trim().is_empty() {
        return Err(SettingInvalid::new("host", "must not be empty"));
    }
    if store.port == 0 {
        return Err(SettingInvalid::new("port", "must be in 1..=65535"));
    }
    Ok(store.clone())
}

async fn ping(core: &WorkerCore, store: &mut dyn CacheStore) -> Result<(), WorkerError> {
    store.ping().await.map_err(|e| core.unavailable(e))
}

pub struct CacheStoreInput {
    core: WorkerCore,
    columns: Vec<String>,
    store: Box<dyn CacheStore>,
}

impl CacheStoreInput {
    pub fn from_settings(
        conf: &WorkerConf,
        settings: &ConnectorSettings,
        factory: &dyn DriverFactory,
    ) -> Result<Self, WorkerError> {
        let store = factory.cache_store(&cache_settings(conf, settings)?);
        Self::with_driver(conf, store)
    }

    pub fn with_driver(conf: &WorkerConf, store: Box<dyn CacheStore>) -> Result<Self, WorkerError> {
        Ok(Self {
            core: WorkerCore::set_conf(conf)?,
            columns: conf.input_columns(),
            store,
        })
    }

    pub fn set_worker(&mut self, store: Box<dyn CacheStore>) {
        self.store = store;
        self.core.set_status(false);
    }
}

#[async_trait]
impl Worker for CacheStoreInput {
    fn core(&self) -> &WorkerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WorkerCore {
        &mut self.core
    }

    async fn probe(&mut self) -> Result<(), WorkerError> {
        ping(&self.core, self.store.as_mut()).await
    }
}

#[async_trait]
impl InputWorker for CacheStoreInput {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn fetch(&mut self, timeout: Duration) -> Result<IndexMap<String, PointValue>, WorkerError> {
        match tokio::time::timeout(timeout, self.store.read(&self.core.target, &self.columns)).await {
            Ok(Ok(values)) => Ok(values),
            Ok(Err(e)) => Err(self.core.driver_failure(e)),
            Err(_) => Err(self.core.timed_out(timeout)),
        }
    }
}

pub struct CacheStoreOutput {
    core: WorkerCore,
    projection: Projection,
    schedule: OutputSchedule,
    store: Box<dyn CacheStore>,
}

impl CacheStoreOutput {
    pub fn from_settings(
        conf: &WorkerConf,
        settings: &ConnectorSettings,
        factory: &dyn DriverFactory,
    ) -> Result<Self, WorkerError> {
        let store = factory.cache_store(&cache_settings(conf, settings)?);
        Self::with_driver(conf, store)
    }

    pub fn with_driver(conf: &WorkerConf, store: Box<dyn CacheStore>) -> Result<Self, WorkerError> {
        Ok(Self {
            core: WorkerCore::set_conf(conf)?,
            projection: conf.projection(),
            schedule: conf.schedule(),
            store,
        })
    }

    pub fn set_worker(&mut self, store: Box<dyn CacheStore>) {
        self.store = store;
        self.core.set_status(false);
    }
}

#[async_trait]
impl Worker for CacheStoreOutput {
    fn core(&self) -> &WorkerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut WorkerCore {
        &mut self.core
    }

    async fn probe(&mut self) -> Result<(), WorkerError> {
        ping(&self.core, self.store.as_mut()).await
    }
}

#[async_trait]
impl OutputWorker for CacheStoreOutput {
    fn projection(&self) -> &Projection {
        &self.projection
    }

    fn schedule(&self) -> &OutputSchedule {
        &self.schedule
    }

    fn schedule_mut(&mut self) -> &mut OutputSchedule {
        &mut self.schedule
    }

    async fn transmit(&mut self, batch: &Batch, _input_structure: &IndexMap<String, Point>) -> Result<(), WorkerError> {
        self.store
            .write(&self.core.target, batch)
            .await
            .map_err(|e| self.core.driver_failure(e))
    }
}
