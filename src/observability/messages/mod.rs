// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Organization
//!
//! * `config` - configuration loading and schema events
//! * `worker` - worker readiness and I/O events
//! * `scheduler` - block scheduling and cache events
//!
//! # Usage Pattern
//!
//! ```rust
//! use vemonitor::observability::messages::scheduler::BlockStarted;
//! use vemonitor::observability::messages::StructuredLog;
//!
//! let msg = BlockStarted {
//!     block: "batMonitor",
//!     inputs: 1,
//!     outputs: 2,
//! };
//!
//! let span = msg.span("block");
//! let _guard = span.enter();
//! msg.log();
//! ```

use tracing::Span;

pub mod config;
pub mod scheduler;
pub mod worker;

/// A log event that knows its own level and fields.
pub trait StructuredLog {
    /// Emit the event at its level with its fields attached.
    fn log(&self);

    /// A span carrying the same fields, for work done on behalf of this event.
    fn span(&self, name: &str) -> Span;
}
