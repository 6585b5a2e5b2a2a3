// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for block scheduling events.
//!
//! This module contains message types for logging events related to:
//! * Orchestrator start and shutdown
//! * Block scheduler lifecycle
//! * Sample cache pressure

use crate::observability::messages::StructuredLog;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// The orchestrator is about to spawn its block schedulers.
///
/// # Log Level
/// `info!` - Important operational event
pub struct OrchestratorStarted {
    pub blocks: usize,
}

impl Display for OrchestratorStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Starting {} block scheduler(s)", self.blocks)
    }
}

impl StructuredLog for OrchestratorStarted {
    fn log(&self) {
        tracing::info!(blocks = self.blocks, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("orchestrator", span_name = name, blocks = self.blocks)
    }
}

/// A block scheduler spawned its worker tasks.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use vemonitor::observability::messages::scheduler::BlockStarted;
///
/// let msg = BlockStarted {
///     block: "batMonitor",
///     inputs: 1,
///     outputs: 2,
/// };
///
/// assert_eq!(msg.to_string(), "Block batMonitor started: 1 input(s), 2 output(s)");
/// ```
pub struct BlockStarted<'a> {
    pub block: &'a str,
    pub inputs: usize,
    pub outputs: usize,
}

impl Display for BlockStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Block {} started: {} input(s), {} output(s)",
            self.block, self.inputs, self.outputs
        )
    }
}

impl StructuredLog for BlockStarted<'_> {
    fn log(&self) {
        tracing::info!(
            block = self.block,
            inputs = self.inputs,
            outputs = self.outputs,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("block", span_name = name, block = self.block)
    }
}

/// A block scheduler finished after cancellation.
///
/// # Log Level
/// `info!` - Important operational event
pub struct BlockStopped<'a> {
    pub block: &'a str,
    pub samples_read: u64,
    pub batches_sent: u64,
    pub failed_sends: u64,
    pub dropped_rows: usize,
}

impl Display for BlockStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Block {} stopped: {} sample(s) read, {} batch(es) sent, {} failed send(s), {} cached row(s) dropped",
            self.block, self.samples_read, self.batches_sent, self.failed_sends, self.dropped_rows
        )
    }
}

impl StructuredLog for BlockStopped<'_> {
    fn log(&self) {
        tracing::info!(
            block = self.block,
            samples_read = self.samples_read,
            batches_sent = self.batches_sent,
            failed_sends = self.failed_sends,
            dropped_rows = self.dropped_rows,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("block_stopped", span_name = name, block = self.block)
    }
}

/// An output's cache for one device hit its hard cap and lost its oldest rows.
///
/// # Log Level
/// `warn!` - Data loss
pub struct CacheOverflow<'a> {
    pub output: &'a str,
    pub device: &'a str,
    pub dropped: usize,
}

impl Display for CacheOverflow<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cache of {} for device {} is full, dropped {} oldest row(s)",
            self.output, self.device, self.dropped
        )
    }
}

impl StructuredLog for CacheOverflow<'_> {
    fn log(&self) {
        tracing::warn!(
            output = self.output,
            device = self.device,
            dropped = self.dropped,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("cache_overflow", span_name = name, output = self.output)
    }
}

/// A worker task ended abnormally. The rest of the block keeps running.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct WorkerTaskFailed<'a> {
    pub block: &'a str,
    pub error: &'a dyn Error,
}

impl Display for WorkerTaskFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "A worker task of block {} failed: {}", self.block, self.error)
    }
}

impl StructuredLog for WorkerTaskFailed<'_> {
    fn log(&self) {
        tracing::error!(block = self.block, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("worker_task_failed", span_name = name, block = self.block)
    }
}

/// Process-level shutdown was requested.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ShutdownRequested;

impl Display for ShutdownRequested {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Shutdown requested, cancelling all blocks")
    }
}

impl StructuredLog for ShutdownRequested {
    fn log(&self) {
        tracing::info!("{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("shutdown", span_name = name)
    }
}
