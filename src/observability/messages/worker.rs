// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for worker readiness and I/O events.

use crate::observability::messages::StructuredLog;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A worker was built from a source ref and registered for a block.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use vemonitor::observability::messages::worker::WorkerBound;
///
/// let msg = WorkerBound {
///     block: "batMonitor",
///     worker: "serial_bmv700_0",
///     kind: "serial",
///     direction: "input",
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Bound input worker serial_bmv700_0 (serial) to block batMonitor"
/// );
/// ```
pub struct WorkerBound<'a> {
    pub block: &'a str,
    pub worker: &'a str,
    pub kind: &'a str,
    pub direction: &'a str,
}

impl Display for WorkerBound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Bound {} worker {} ({}) to block {}",
            self.direction, self.worker, self.kind, self.block
        )
    }
}

impl StructuredLog for WorkerBound<'_> {
    fn log(&self) {
        tracing::info!(
            block = self.block,
            worker = self.worker,
            kind = self.kind,
            direction = self.direction,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "worker",
            span_name = name,
            block = self.block,
            worker = self.worker,
            kind = self.kind,
            direction = self.direction,
        )
    }
}

/// A readiness probe succeeded after the worker was not ready.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkerReady<'a> {
    pub worker: &'a str,
}

impl Display for WorkerReady<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker {} is ready", self.worker)
    }
}

impl StructuredLog for WorkerReady<'_> {
    fn log(&self) {
        tracing::info!(worker = self.worker, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("worker_ready", span_name = name, worker = self.worker)
    }
}

/// A readiness probe failed. The worker stays registered and is re-probed.
///
/// # Log Level
/// `warn!` - Recoverable failure
pub struct WorkerProbeFailed<'a> {
    pub worker: &'a str,
    pub error: &'a dyn Error,
}

impl Display for WorkerProbeFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker {} is unavailable: {}", self.worker, self.error)
    }
}

impl StructuredLog for WorkerProbeFailed<'_> {
    fn log(&self) {
        tracing::warn!(worker = self.worker, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("worker_probe_failed", span_name = name, worker = self.worker)
    }
}

/// An input read failed; the worker is marked not ready.
///
/// # Log Level
/// `warn!` - Recoverable failure
pub struct ReadFailed<'a> {
    pub worker: &'a str,
    pub error: &'a dyn Error,
}

impl Display for ReadFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Read from {} failed: {}", self.worker, self.error)
    }
}

impl StructuredLog for ReadFailed<'_> {
    fn log(&self) {
        tracing::warn!(worker = self.worker, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("read_failed", span_name = name, worker = self.worker)
    }
}

/// A raw field could not be decoded as its point's input type.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct FieldUndecodable<'a> {
    pub worker: &'a str,
    pub column: &'a str,
    pub raw: &'a str,
}

impl Display for FieldUndecodable<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Dropping {}={:?} from {}: does not decode", self.column, self.raw, self.worker)
    }
}

impl StructuredLog for FieldUndecodable<'_> {
    fn log(&self) {
        tracing::debug!(worker = self.worker, column = self.column, raw = self.raw, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("field_undecodable", span_name = name, column = self.column)
    }
}

/// A batch was accepted by an output.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct BatchSent<'a> {
    pub worker: &'a str,
    pub rows: usize,
    pub offset: Duration,
}

impl Display for BatchSent<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Sent {} row(s) to {} (offset {:?})", self.rows, self.worker, self.offset)
    }
}

impl StructuredLog for BatchSent<'_> {
    fn log(&self) {
        tracing::debug!(
            worker = self.worker,
            rows = self.rows,
            offset_ms = self.offset.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("batch_sent", span_name = name, worker = self.worker, rows = self.rows)
    }
}

/// An output rejected a batch; the rows go back to the cache.
///
/// # Log Level
/// `warn!` - Recoverable failure
pub struct SendFailed<'a> {
    pub worker: &'a str,
    pub rows: usize,
    pub error: &'a dyn Error,
}

impl Display for SendFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Send of {} row(s) to {} failed, keeping them pending: {}",
            self.rows, self.worker, self.error
        )
    }
}

impl StructuredLog for SendFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            worker = self.worker,
            rows = self.rows,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("send_failed", span_name = name, worker = self.worker)
    }
}

/// A send waited for the output's minimum request interval.
///
/// # Log Level
/// `trace!` - Very detailed diagnostic information
pub struct RequestPaced<'a> {
    pub worker: &'a str,
    pub wait: Duration,
}

impl Display for RequestPaced<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pacing {} for {:?}", self.worker, self.wait)
    }
}

impl StructuredLog for RequestPaced<'_> {
    fn log(&self) {
        tracing::trace!(worker = self.worker, wait_ms = self.wait.as_millis() as u64, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!("request_paced", span_name = name, worker = self.worker)
    }
}
