// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-block scheduling: one task per worker, all sharing the block's sample cache.
//!
//! Input tasks wake every `time_interval`, re-probe when not ready, and
//! append a stamped row per successful read. Output tasks wake on the same
//! kind of ticker and flush when `cache_interval` elapsed or a device queue
//! reached the soft cap. A flush waits out `min_req_interval`, sends, and
//! either records the success or puts the rows back.
//!
//! Cancellation is checked between ticks and during the pacing wait, never
//! inside a driver call. Rows still cached at cancellation are dropped.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::observability::messages::scheduler::{BlockStarted, BlockStopped, WorkerTaskFailed};
use crate::observability::messages::worker::RequestPaced;
use crate::observability::messages::StructuredLog;
use crate::traits::{InputWorker, OutputWorker, Worker};
use crate::workers::{ActiveConnectors, BatchRow, Direction, Workers};

use super::cache::{SampleCache, SharedCache};

/// Counters of one block run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockReport {
    pub block: String,
    pub samples_read: u64,
    pub batches_sent: u64,
    pub failed_sends: u64,
    /// Rows discarded by the hard cap or left in the cache at shutdown.
    pub dropped_rows: usize,
}

#[derive(Default)]
struct Counters {
    samples_read: AtomicU64,
    batches_sent: AtomicU64,
    failed_sends: AtomicU64,
    dropped_rows: AtomicU64,
}

#[derive(Clone)]
struct TaskContext {
    block: Arc<str>,
    cache: SharedCache,
    active: ActiveConnectors,
    counters: Arc<Counters>,
    cancel: CancellationToken,
}

impl TaskContext {
    /// Probe a not-ready worker and publish the outcome. Returns readiness.
    async fn ensure_ready<W: Worker + ?Sized>(&self, worker: &mut W, direction: Direction) -> bool {
        if worker.is_ready() {
            return true;
        }
        let ready = worker.set_worker_status().await;
        self.active
            .set_status(&self.block, worker.worker_key(), worker.name(), direction, ready);
        ready
    }

    fn publish_lost<W: Worker + ?Sized>(&self, worker: &W, direction: Direction) {
        if !worker.is_ready() {
            self.active
                .set_status(&self.block, worker.worker_key(), worker.name(), direction, false);
        }
    }

    fn count_dropped(&self, rows: usize) {
        self.counters.dropped_rows.fetch_add(rows as u64, Ordering::Relaxed);
    }
}

pub struct BlockScheduler {
    block: String,
    workers: Workers,
    active: ActiveConnectors,
    span: Span,
}

impl BlockScheduler {
    /// `span` is entered by every task of this block.
    pub fn new(block: impl Into<String>, workers: Workers, active: ActiveConnectors, span: Span) -> Self {
        Self {
            block: block.into(),
            workers,
            active,
            span,
        }
    }

    pub fn block(&self) -> &str {
        &self.block
    }

    pub fn workers(&self) -> &Workers {
        &self.workers
    }

    /// Run until `cancel` fires and every task has finished its current step.
    pub async fn run(self, cancel: CancellationToken) -> BlockReport {
        let Self {
            block,
            workers,
            active,
            span,
        } = self;

        let cache = SampleCache::new(
            workers
                .outputs
                .iter()
                .map(|(name, w)| (name.to_string(), w.projection().clone())),
        )
        .shared();

        let ctx = TaskContext {
            block: Arc::from(block.as_str()),
            cache: Arc::clone(&cache),
            active,
            counters: Arc::new(Counters::default()),
            cancel,
        };

        span.in_scope(|| {
            BlockStarted {
                block: &block,
                inputs: workers.inputs.len(),
                outputs: workers.outputs.len(),
            }
            .log()
        });

        let mut tasks = JoinSet::new();
        for (_, worker) in workers.inputs {
            let task_span = worker.core().span().clone();
            tasks.spawn(
                run_input(worker, ctx.clone())
                    .instrument(task_span)
                    .instrument(span.clone()),
            );
        }
        for (_, worker) in workers.outputs {
            let task_span = worker.core().span().clone();
            tasks.spawn(
                run_output(worker, ctx.clone())
                    .instrument(task_span)
                    .instrument(span.clone()),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                span.in_scope(|| WorkerTaskFailed { block: &block, error: &e }.log());
            }
        }

        let discarded = cache.lock().await.clear();
        ctx.count_dropped(discarded);

        let report = BlockReport {
            block,
            samples_read: ctx.counters.samples_read.load(Ordering::Relaxed),
            batches_sent: ctx.counters.batches_sent.load(Ordering::Relaxed),
            failed_sends: ctx.counters.failed_sends.load(Ordering::Relaxed),
            dropped_rows: ctx.counters.dropped_rows.load(Ordering::Relaxed) as usize,
        };
        span.in_scope(|| {
            BlockStopped {
                block: &report.block,
                samples_read: report.samples_read,
                batches_sent: report.batches_sent,
                failed_sends: report.failed_sends,
                dropped_rows: report.dropped_rows,
            }
            .log()
        });
        report
    }
}

async fn run_input(mut worker: Box<dyn InputWorker>, ctx: TaskContext) {
    let mut ticker = tokio::time::interval(worker.time_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !ctx.ensure_ready(&mut *worker, Direction::Input).await {
            continue;
        }

        let timeout = worker.read_timeout();
        let values = worker.read_data(timeout).await;
        ctx.publish_lost(&*worker, Direction::Input);
        if values.is_empty() {
            continue;
        }

        let row = BatchRow {
            device: worker.device().to_string(),
            time: Utc::now(),
            values,
        };
        ctx.counters.samples_read.fetch_add(1, Ordering::Relaxed);
        let dropped = ctx.cache.lock().await.append(&row);
        ctx.count_dropped(dropped);
    }
}

async fn run_output(mut worker: Box<dyn OutputWorker>, ctx: TaskContext) {
    let mut ticker = tokio::time::interval(worker.time_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    worker.schedule_mut().restart_window();

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !ctx.ensure_ready(&mut *worker, Direction::Output).await {
            continue;
        }

        let batch = {
            let mut cache = ctx.cache.lock().await;
            let due = worker.schedule().is_cache_due(Instant::now()) || cache.over_soft_cap(worker.name());
            if !due {
                continue;
            }
            cache.take_batch(worker.name(), Utc::now())
        };
        let Some(batch) = batch else {
            continue;
        };

        let paced = tokio::select! {
            _ = ctx.cancel.cancelled() => None,
            wait = worker.schedule().respect_req_interval() => Some(wait),
        };
        let Some(wait) = paced else {
            let dropped = ctx.cache.lock().await.restore(worker.name(), batch);
            ctx.count_dropped(dropped);
            break;
        };
        if !wait.is_zero() {
            RequestPaced {
                worker: worker.name(),
                wait,
            }
            .log();
        }

        let structure = worker.projection().input_structure(&batch);
        if worker.send_data(&batch, &structure).await {
            worker.schedule_mut().record_success();
            ctx.counters.batches_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            ctx.counters.failed_sends.fetch_add(1, Ordering::Relaxed);
            ctx.publish_lost(&*worker, Direction::Output);
            let dropped = ctx.cache.lock().await.restore(worker.name(), batch);
            ctx.count_dropped(dropped);
        }
    }
}
