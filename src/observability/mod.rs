// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every operational event vemonitor reports is a message struct with a
//! `Display` implementation and a [`messages::StructuredLog`] implementation,
//! so call sites never carry format strings of their own.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::config` - file resolution, imports, schemas, connector reduction
//! * `messages::worker` - readiness probes, reads, sends, request pacing
//! * `messages::scheduler` - block and orchestrator lifecycle, cache pressure
//!
//! # Usage
//!
//! ```rust
//! use vemonitor::observability::messages::worker::WorkerProbeFailed;
//! use vemonitor::observability::messages::StructuredLog;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "connection refused");
//! WorkerProbeFailed {
//!     worker: "redis_local_0",
//!     error: &error,
//! }
//! .log();
//! ```
//!
//! The library never installs a subscriber; the `vemonitor` binary does.

pub mod messages;
