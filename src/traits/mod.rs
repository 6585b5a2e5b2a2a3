// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod driver;
pub mod worker;

pub use driver::{CacheStore, DriverFactory, SerialDevice, Target, TelemetryClient};
pub use worker::{InputWorker, OutputWorker, Worker};
