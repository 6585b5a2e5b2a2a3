// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory drivers for tests. Clones share state so a test can keep a
//! handle while the worker owns another.

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::{CacheStoreSettings, ConnectorKind, HttpSettings, Point, PointValue, SerialSettings};
use crate::errors::DriverError;
use crate::traits::{CacheStore, DriverFactory, SerialDevice, Target, TelemetryClient};
use crate::workers::batch::Batch;

fn owned<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> IndexMap<String, String> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[derive(Clone, Default)]
pub struct StubSerial {
    identity: Arc<IndexMap<String, String>>,
    frame: Arc<Mutex<IndexMap<String, String>>>,
    fail_reads: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl StubSerial {
    pub fn new<'a>(
        identity: impl IntoIterator<Item = (&'a str, &'a str)>,
        frame: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            identity: Arc::new(owned(identity)),
            frame: Arc::new(Mutex::new(owned(frame))),
            ..Self::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SerialDevice for StubSerial {
    async fn identify(&mut self) -> Result<IndexMap<String, String>, DriverError> {
        Ok(self.identity.as_ref().clone())
    }

    async fn read_frame(&mut self) -> Result<IndexMap<String, String>, DriverError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DriverError::Io("line closed".into()));
        }
        Ok(self.frame.lock().clone())
    }
}

#[derive(Clone, Default)]
pub struct StubCacheStore {
    unreachable: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    values: Arc<Mutex<IndexMap<String, PointValue>>>,
    written: Arc<Mutex<Vec<(Target, Batch)>>>,
    reads: Arc<AtomicUsize>,
}

impl StubCacheStore {
    pub fn unreachable() -> Self {
        let stub = Self::default();
        stub.unreachable.store(true, Ordering::SeqCst);
        stub
    }

    pub fn with_value(self, column: &str, value: PointValue) -> Self {
        self.values.lock().insert(column.to_string(), value);
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn written(&self) -> Vec<(Target, Batch)> {
        self.written.lock().clone()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn reachable(&self) -> Result<(), DriverError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DriverError::Connection("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for StubCacheStore {
    async fn ping(&mut self) -> Result<(), DriverError> {
        self.reachable()
    }

    async fn read(&mut self, _target: &Target, columns: &[String]) -> Result<IndexMap<String, PointValue>, DriverError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.reachable()?;
        let values = self.values.lock();
        Ok(columns
            .iter()
            .filter_map(|c| values.get(c).map(|v| (c.clone(), v.clone())))
            .collect())
    }

    async fn write(&mut self, target: &Target, batch: &Batch) -> Result<(), DriverError> {
        self.reachable()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DriverError::Rejected("write refused".into()));
        }
        self.written.lock().push((target.clone(), batch.clone()));
        Ok(())
    }
}

/// One accepted telemetry request.
#[derive(Debug, Clone)]
pub struct SentBatch {
    pub target: Target,
    pub batch: Batch,
    /// Emitted column names of the input structure, in order.
    pub structure: Vec<String>,
    pub at: Instant,
}

#[derive(Clone, Default)]
pub struct StubTelemetry {
    unreachable: Arc<AtomicBool>,
    fail_sends: Arc<AtomicBool>,
    sent: Arc<Mutex<Vec<SentBatch>>>,
    attempts: Arc<AtomicUsize>,
}

impl StubTelemetry {
    pub fn unreachable() -> Self {
        let stub = Self::default();
        stub.unreachable.store(true, Ordering::SeqCst);
        stub
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentBatch> {
        self.sent.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetryClient for StubTelemetry {
    async fn ping(&mut self) -> Result<(), DriverError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DriverError::Connection("no route to host".into()));
        }
        Ok(())
    }

    async fn send(
        &mut self,
        target: &Target,
        batch: &Batch,
        input_structure: &IndexMap<String, Point>,
    ) -> Result<(), DriverError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(DriverError::Rejected("503 service unavailable".into()));
        }
        self.sent.lock().push(SentBatch {
            target: target.clone(),
            batch: batch.clone(),
            structure: input_structure.keys().cloned().collect(),
            at: Instant::now(),
        });
        Ok(())
    }
}

/// Hands out clones of one stub per driver shape and records the settings it was given.
#[derive(Clone, Default)]
pub struct StubDriverFactory {
    serial: StubSerial,
    cache_store: StubCacheStore,
    telemetry: StubTelemetry,
    serial_settings: Arc<Mutex<Vec<SerialSettings>>>,
    cache_store_settings: Arc<Mutex<Vec<CacheStoreSettings>>>,
    telemetry_kinds: Arc<Mutex<Vec<ConnectorKind>>>,
}

impl StubDriverFactory {
    pub fn with_serial(mut self, serial: StubSerial) -> Self {
        self.serial = serial;
        self
    }

    pub fn with_cache_store(mut self, cache_store: StubCacheStore) -> Self {
        self.cache_store = cache_store;
        self
    }

    pub fn with_telemetry(mut self, telemetry: StubTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn serial_settings(&self) -> Vec<SerialSettings> {
        self.serial_settings.lock().clone()
    }

    pub fn cache_store_settings(&self) -> Vec<CacheStoreSettings> {
        self.cache_store_settings.lock().clone()
    }

    pub fn telemetry_kinds(&self) -> Vec<ConnectorKind> {
        self.telemetry_kinds.lock().clone()
    }
}

impl DriverFactory for StubDriverFactory {
    fn serial(&self, settings: &SerialSettings) -> Box<dyn SerialDevice> {
        self.serial_settings.lock().push(settings.clone());
        Box::new(self.serial.clone())
    }

    fn cache_store(&self, settings: &CacheStoreSettings) -> Box<dyn CacheStore> {
        self.cache_store_settings.lock().push(settings.clone());
        Box::new(self.cache_store.clone())
    }

    fn telemetry(&self, kind: ConnectorKind, _settings: &HttpSettings) -> Box<dyn TelemetryClient> {
        self.telemetry_kinds.lock().push(kind);
        Box::new(self.telemetry.clone())
    }
}
