// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Capability traits shared by every worker.
//!
//! Implementors provide the driver-specific pieces (`probe`, `fetch`,
//! `transmit`); readiness bookkeeping and failure logging live in the
//! default methods so every worker flips `status` the same way.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::time::Duration;

use crate::config::{ConnectorKind, Point, PointValue};
use crate::errors::WorkerError;
use crate::observability::messages::worker::{BatchSent, ReadFailed, SendFailed, WorkerProbeFailed, WorkerReady};
use crate::observability::messages::StructuredLog;
use crate::workers::batch::{Batch, Projection};
use crate::workers::core::WorkerCore;
use crate::workers::pacing::OutputSchedule;

#[async_trait]
pub trait Worker: Send {
    fn core(&self) -> &WorkerCore;

    fn core_mut(&mut self) -> &mut WorkerCore;

    /// Liveness check against the driver, opening it on first use.
    async fn probe(&mut self) -> Result<(), WorkerError>;

    fn name(&self) -> &str {
        &self.core().name
    }

    fn worker_key(&self) -> ConnectorKind {
        self.core().worker_key
    }

    fn enum_key(&self) -> usize {
        self.core().enum_key
    }

    fn time_interval(&self) -> Duration {
        self.core().time_interval
    }

    /// Probe the driver and cache the outcome as the worker's status.
    async fn set_worker_status(&mut self) -> bool {
        let outcome = self.probe().await;
        let _guard = self.core().span().clone().entered();
        match outcome {
            Ok(()) => {
                if !self.core_mut().set_status(true) {
                    WorkerReady { worker: self.name() }.log();
                }
                true
            }
            Err(e) => {
                WorkerProbeFailed {
                    worker: self.name(),
                    error: &e,
                }
                .log();
                self.core_mut().set_status(false);
                false
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.core().status() && self.core().is_configured()
    }
}

#[async_trait]
pub trait InputWorker: Worker {
    /// Ordered columns this input samples.
    fn columns(&self) -> &[String];

    /// Device name the samples are attributed to.
    fn device(&self) -> &str {
        self.core().source()
    }

    /// Upper bound for one read.
    fn read_timeout(&self) -> Duration {
        self.time_interval()
    }

    /// One driver read, bounded by `timeout`.
    async fn fetch(&mut self, timeout: Duration) -> Result<IndexMap<String, PointValue>, WorkerError>;

    /// Sample `columns`. A failed read yields an empty sample and marks the worker not ready.
    async fn read_data(&mut self, timeout: Duration) -> IndexMap<String, PointValue> {
        match self.fetch(timeout).await {
            Ok(values) => values,
            Err(e) => {
                let _guard = self.core().span().clone().entered();
                ReadFailed {
                    worker: self.name(),
                    error: &e,
                }
                .log();
                self.core_mut().set_status(false);
                IndexMap::new()
            }
        }
    }
}

#[async_trait]
pub trait OutputWorker: Worker {
    fn projection(&self) -> &Projection;

    fn schedule(&self) -> &OutputSchedule;

    fn schedule_mut(&mut self) -> &mut OutputSchedule;

    /// `device -> [column]` this output subscribes to.
    fn columns(&self) -> &IndexMap<String, Vec<String>> {
        self.projection().columns()
    }

    async fn transmit(&mut self, batch: &Batch, input_structure: &IndexMap<String, Point>) -> Result<(), WorkerError>;

    /// Hand a batch to the driver. On failure the worker is marked not ready
    /// and the caller keeps the rows.
    async fn send_data(&mut self, batch: &Batch, input_structure: &IndexMap<String, Point>) -> bool {
        let outcome = self.transmit(batch, input_structure).await;
        let _guard = self.core().span().clone().entered();
        match outcome {
            Ok(()) => {
                BatchSent {
                    worker: self.name(),
                    rows: batch.len(),
                    offset: batch.offset,
                }
                .log();
                true
            }
            Err(e) => {
                SendFailed {
                    worker: self.name(),
                    rows: batch.len(),
                    error: &e,
                }
                .log();
                self.core_mut().set_status(false);
                false
            }
        }
    }
}
