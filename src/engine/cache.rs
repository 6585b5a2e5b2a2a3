// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-output sample caches shared between a block's input and output tasks.
//!
//! Rows are projected for each subscribed output when they arrive, so an
//! output only ever holds its own columns. Each output keeps one queue per
//! device; queues are bounded by a hard cap that drops the oldest rows.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::consts::{CACHE_HARD_CAP, CACHE_SOFT_CAP};
use crate::observability::messages::scheduler::CacheOverflow;
use crate::observability::messages::StructuredLog;
use crate::workers::{Batch, BatchRow, Projection};

pub type SharedCache = Arc<Mutex<SampleCache>>;

#[derive(Debug, Clone)]
struct OutputCache {
    projection: Projection,
    devices: IndexMap<String, VecDeque<BatchRow>>,
}

impl OutputCache {
    /// Push to the back and trim the front down to `hard_cap`. Returns the rows dropped.
    fn push(&mut self, row: BatchRow, hard_cap: usize) -> usize {
        let queue = self.devices.entry(row.device.clone()).or_default();
        queue.push_back(row);
        let excess = queue.len().saturating_sub(hard_cap);
        queue.drain(..excess);
        excess
    }

    fn len(&self) -> usize {
        self.devices.values().map(VecDeque::len).sum()
    }
}

#[derive(Debug, Clone)]
pub struct SampleCache {
    outputs: IndexMap<String, OutputCache>,
    soft_cap: usize,
    hard_cap: usize,
}

impl SampleCache {
    pub fn new<I>(outputs: I) -> Self
    where
        I: IntoIterator<Item = (String, Projection)>,
    {
        Self::with_caps(outputs, CACHE_SOFT_CAP, CACHE_HARD_CAP)
    }

    pub fn with_caps<I>(outputs: I, soft_cap: usize, hard_cap: usize) -> Self
    where
        I: IntoIterator<Item = (String, Projection)>,
    {
        let outputs = outputs
            .into_iter()
            .map(|(name, projection)| {
                (
                    name,
                    OutputCache {
                        projection,
                        devices: IndexMap::new(),
                    },
                )
            })
            .collect();
        Self {
            outputs,
            soft_cap,
            hard_cap: hard_cap.max(1),
        }
    }

    pub fn shared(self) -> SharedCache {
        Arc::new(Mutex::new(self))
    }

    /// Project `row` into every subscribed output. Returns the rows dropped by the hard cap.
    pub fn append(&mut self, row: &BatchRow) -> usize {
        let mut dropped = 0;
        for (output, cache) in self.outputs.iter_mut() {
            let Some(projected) = cache.projection.project(row) else {
                continue;
            };
            let overflow = cache.push(projected, self.hard_cap);
            if overflow > 0 {
                CacheOverflow {
                    output,
                    device: &row.device,
                    dropped: overflow,
                }
                .log();
                dropped += overflow;
            }
        }
        dropped
    }

    /// Rows waiting for `output`.
    pub fn pending(&self, output: &str) -> usize {
        self.outputs.get(output).map(OutputCache::len).unwrap_or(0)
    }

    /// True when any device queue of `output` reached the soft cap.
    pub fn over_soft_cap(&self, output: &str) -> bool {
        self.outputs
            .get(output)
            .is_some_and(|c| c.devices.values().any(|q| q.len() >= self.soft_cap))
    }

    /// Drain everything pending for `output` into one batch, oldest first per device.
    pub fn take_batch(&mut self, output: &str, now: DateTime<Utc>) -> Option<Batch> {
        let cache = self.outputs.get_mut(output)?;
        let rows: Vec<BatchRow> = cache.devices.values_mut().flat_map(|q| q.drain(..)).collect();
        if rows.is_empty() {
            return None;
        }
        Some(Batch::new(rows, now))
    }

    /// Put an unsent batch back ahead of rows that arrived since it was taken.
    /// Returns the rows dropped by the hard cap.
    pub fn restore(&mut self, output: &str, batch: Batch) -> usize {
        let hard_cap = self.hard_cap;
        let Some(cache) = self.outputs.get_mut(output) else {
            return batch.len();
        };

        let mut by_device: IndexMap<String, Vec<BatchRow>> = IndexMap::new();
        for row in batch.rows {
            by_device.entry(row.device.clone()).or_default().push(row);
        }

        let mut dropped = 0;
        for (device, rows) in by_device {
            let queue = cache.devices.entry(device.clone()).or_default();
            for row in rows.into_iter().rev() {
                queue.push_front(row);
            }
            let excess = queue.len().saturating_sub(hard_cap);
            if excess > 0 {
                queue.drain(..excess);
                CacheOverflow {
                    output,
                    device: &device,
                    dropped: excess,
                }
                .log();
                dropped += excess;
            }
        }
        dropped
    }

    /// Empty every queue. Returns the number of rows discarded.
    pub fn clear(&mut self) -> usize {
        self.outputs
            .values_mut()
            .flat_map(|c| c.devices.values_mut())
            .map(|q| {
                let n = q.len();
                q.clear();
                n
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Point, PointType, PointValue, RefCol};
    use chrono::TimeZone;

    fn row(device: &str, secs: i64, v: f64) -> BatchRow {
        BatchRow {
            device: device.to_string(),
            time: Utc.timestamp_opt(secs, 0).unwrap(),
            values: IndexMap::from([
                ("V".to_string(), PointValue::Float(v)),
                ("I".to_string(), PointValue::Float(-v)),
            ]),
        }
    }

    fn projection(device: &str, columns: &[&str]) -> Projection {
        let float = Point::new(PointType::Int, PointType::Float, 1000);
        Projection::new(
            IndexMap::from([(device.to_string(), columns.iter().map(|c| c.to_string()).collect())]),
            Vec::<RefCol>::new(),
            IndexMap::from([("V".to_string(), float.clone()), ("I".to_string(), float)]),
        )
    }

    fn cache(soft: usize, hard: usize) -> SampleCache {
        SampleCache::with_caps(
            [
                ("redis_local_0".to_string(), projection("bmv700", &["V"])),
                ("emoncms_emon_0".to_string(), projection("mppt1", &["V", "I"])),
            ],
            soft,
            hard,
        )
    }

    #[test]
    fn test_rows_reach_only_subscribed_outputs() {
        let mut cache = cache(10, 100);
        cache.append(&row("bmv700", 1, 12.0));
        cache.append(&row("bmv700", 2, 12.1));
        cache.append(&row("mppt1", 2, 30.0));

        assert_eq!(cache.pending("redis_local_0"), 2);
        assert_eq!(cache.pending("emoncms_emon_0"), 1);

        let batch = cache.take_batch("redis_local_0", Utc.timestamp_opt(5, 0).unwrap()).unwrap();
        assert_eq!(batch.columns(), vec!["V"]);
        assert_eq!(batch.offset, std::time::Duration::from_secs(3));
        assert_eq!(cache.pending("redis_local_0"), 0);
        assert!(cache.take_batch("redis_local_0", Utc::now()).is_none());
    }

    #[test]
    fn test_hard_cap_drops_oldest() {
        let mut cache = cache(2, 3);
        for secs in 0..5 {
            cache.append(&row("bmv700", secs, secs as f64));
        }
        assert!(cache.over_soft_cap("redis_local_0"));
        let batch = cache.take_batch("redis_local_0", Utc::now()).unwrap();
        let times: Vec<i64> = batch.rows.iter().map(|r| r.time.timestamp()).collect();
        assert_eq!(times, vec![2, 3, 4]);
    }

    #[test]
    fn test_restore_goes_ahead_of_newer_rows() {
        let mut cache = cache(10, 3);
        cache.append(&row("bmv700", 1, 1.0));
        cache.append(&row("bmv700", 2, 2.0));
        let batch = cache.take_batch("redis_local_0", Utc::now()).unwrap();

        cache.append(&row("bmv700", 3, 3.0));
        cache.append(&row("bmv700", 4, 4.0));
        assert_eq!(cache.restore("redis_local_0", batch), 1);

        let again = cache.take_batch("redis_local_0", Utc::now()).unwrap();
        let times: Vec<i64> = again.rows.iter().map(|r| r.time.timestamp()).collect();
        assert_eq!(times, vec![2, 3, 4]);
    }

    #[test]
    fn test_clear_counts_discarded_rows() {
        let mut cache = cache(10, 100);
        cache.append(&row("bmv700", 1, 1.0));
        cache.append(&row("mppt1", 1, 1.0));
        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.pending("emoncms_emon_0"), 0);
    }
}
