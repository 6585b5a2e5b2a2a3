// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Output scheduling fields: cache accumulation and request pacing.
//!
//! Elapsed-time checks use tokio's monotonic clock so paused-time tests
//! drive them deterministically. `last_saved_time` is wall-clock epoch
//! seconds and only ever moves through the skew-checked setter.

use chrono::Utc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::consts::{DEFAULT_CACHE_INTERVAL, DEFAULT_MAX_CLOCK_SKEW, DEFAULT_MIN_REQ_INTERVAL};
use crate::config::SourceRef;
use crate::errors::SettingInvalid;

#[derive(Debug, Clone)]
pub struct OutputSchedule {
    cache_interval: Duration,
    min_req_interval: Duration,
    max_clock_skew: Duration,
    last_req: Option<Instant>,
    last_flush: Instant,
    last_saved_time: Option<i64>,
}

impl Default for OutputSchedule {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_CACHE_INTERVAL),
            Duration::from_secs(DEFAULT_MIN_REQ_INTERVAL),
        )
    }
}

impl OutputSchedule {
    pub fn new(cache_interval: Duration, min_req_interval: Duration) -> Self {
        Self {
            cache_interval,
            min_req_interval,
            max_clock_skew: Duration::from_secs(DEFAULT_MAX_CLOCK_SKEW),
            last_req: None,
            last_flush: Instant::now(),
            last_saved_time: None,
        }
    }

    /// Read the optional per-output overrides, falling back to the defaults.
    pub fn from_source_ref(source_ref: &SourceRef) -> Self {
        let mut schedule = Self::new(
            Duration::from_secs(source_ref.cache_interval.unwrap_or(DEFAULT_CACHE_INTERVAL)),
            Duration::from_secs(source_ref.min_req_interval.unwrap_or(DEFAULT_MIN_REQ_INTERVAL)),
        );
        if let Some(skew) = source_ref.max_clock_skew {
            schedule.max_clock_skew = Duration::from_secs(skew);
        }
        schedule
    }

    pub fn cache_interval(&self) -> Duration {
        self.cache_interval
    }

    pub fn min_req_interval(&self) -> Duration {
        self.min_req_interval
    }

    pub fn last_req(&self) -> Option<Instant> {
        self.last_req
    }

    pub fn last_saved_time(&self) -> Option<i64> {
        self.last_saved_time
    }

    /// How long a send issued at `now` has to wait. Zero when no send happened yet.
    pub fn req_wait(&self, now: Instant) -> Duration {
        match self.last_req {
            Some(last) => self.min_req_interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Sleep until `min_req_interval` has passed since the last successful send.
    /// Returns the time spent waiting.
    pub async fn respect_req_interval(&self) -> Duration {
        let wait = self.req_wait(Instant::now());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        wait
    }

    pub fn update_req_time(&mut self) {
        self.last_req = Some(Instant::now());
    }

    /// True once `cache_interval` has passed since the last flush.
    pub fn is_cache_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_flush) >= self.cache_interval
    }

    /// Start the first accumulation window now rather than at construction.
    pub fn restart_window(&mut self) {
        self.last_flush = Instant::now();
    }

    /// Accept `epoch_secs` only when it lies within `max_clock_skew` of the wall clock.
    pub fn set_last_saved_time(&mut self, epoch_secs: i64) -> Result<(), SettingInvalid> {
        if epoch_secs < 0 {
            return Err(SettingInvalid::new("last_saved_time", "must not be negative"));
        }
        let now = Utc::now().timestamp();
        let skew = i64::try_from(self.max_clock_skew.as_secs()).unwrap_or(i64::MAX);
        if (epoch_secs - now).abs() > skew {
            return Err(SettingInvalid::new(
                "last_saved_time",
                format!("{epoch_secs} is more than {skew}s away from the current time {now}"),
            ));
        }
        self.last_saved_time = Some(epoch_secs);
        Ok(())
    }

    /// Bookkeeping after a successful send.
    pub fn record_success(&mut self) {
        self.last_flush = Instant::now();
        self.last_saved_time = Some(Utc::now().timestamp());
        self.update_req_time();
    }
}
