// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;         // loader + typed model
pub mod engine;         // block binding and scheduling
pub mod errors;         // error handling
pub mod observability;  // structured log messages
pub mod schema;         // schema vocabulary, registry, validator
pub mod traits;         // driver and worker seams
pub mod workers;        // worker kernel
