// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runs every active block of a configuration under one shutdown token.

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::errors::{SettingInvalid, VeMonitorResult};
use crate::observability::messages::scheduler::{BlockStarted, OrchestratorStarted, WorkerTaskFailed};
use crate::observability::messages::StructuredLog;
use crate::workers::{ActiveConnectors, WorkerRegistry};

use super::binding::bind_block;
use super::scheduler::{BlockReport, BlockScheduler};

/// Reports of the blocks that ran, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub blocks: Vec<BlockReport>,
}

impl RunReport {
    pub fn block(&self, name: &str) -> Option<&BlockReport> {
        self.blocks.iter().find(|b| b.block == name)
    }
}

pub struct Orchestrator {
    config: Config,
    registry: WorkerRegistry,
    active: ActiveConnectors,
}

impl Orchestrator {
    pub fn new(config: Config, registry: WorkerRegistry) -> Self {
        Self {
            config,
            registry,
            active: ActiveConnectors::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bound connectors and their last probe status, per block and kind.
    pub fn active_connectors(&self) -> &ActiveConnectors {
        &self.active
    }

    /// Bind every block against the reduced connector catalogue.
    pub fn bind(&self) -> VeMonitorResult<Vec<BlockScheduler>> {
        let blocks = self
            .config
            .blocks()
            .ok_or_else(|| SettingInvalid::new("appBlocks", "section is missing"))?;
        let data = self
            .config
            .data_structures()
            .ok_or_else(|| SettingInvalid::new("data_structure", "section is missing"))?;
        let connectors = self.config.active_connectors();

        blocks
            .iter()
            .map(|block| {
                let workers = bind_block(block, &connectors, data, &self.registry, &self.active)?;
                let span = BlockStarted {
                    block: &block.name,
                    inputs: workers.inputs.len(),
                    outputs: workers.outputs.len(),
                }
                .span("block");
                Ok(BlockScheduler::new(block.name.clone(), workers, self.active.clone(), span))
            })
            .collect()
    }

    /// Bind, then run each block on a child of `shutdown` until it is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> VeMonitorResult<RunReport> {
        let schedulers = self.bind()?;
        OrchestratorStarted {
            blocks: schedulers.len(),
        }
        .log();

        let mut tasks = JoinSet::new();
        for scheduler in schedulers {
            tasks.spawn(scheduler.run(shutdown.child_token()));
        }

        let mut report = RunReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(block) => report.blocks.push(block),
                Err(e) => WorkerTaskFailed {
                    block: "orchestrator",
                    error: &e,
                }
                .log(),
            }
        }
        Ok(report)
    }
}
