// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Block execution: binding source refs to workers, caching samples per
//! output, scheduling each block's tasks and running all blocks together.

pub mod binding;
pub mod cache;
pub mod orchestrator;
pub mod scheduler;

pub use binding::{bind_block, device_columns};
pub use cache::{SampleCache, SharedCache};
pub use orchestrator::{Orchestrator, RunReport};
pub use scheduler::{BlockReport, BlockScheduler};
