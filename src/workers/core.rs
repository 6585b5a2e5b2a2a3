// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! State shared by every worker: identity, timing and readiness.

use indexmap::IndexMap;
use std::fmt;
use std::time::Duration;
use tracing::Span;

use crate::config::consts::MAX_REFS_PER_KIND;
use crate::config::{ConnectorKind, Point, RefCol, SourceRef};
use crate::errors::{DriverError, SettingInvalid, WorkerError};
use crate::observability::messages::worker::WorkerBound;
use crate::observability::messages::StructuredLog;
use crate::schema::Pattern;
use crate::traits::Target;
use crate::workers::batch::Projection;
use crate::workers::pacing::OutputSchedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything pipeline binding knows about one source ref.
#[derive(Debug, Clone)]
pub struct WorkerConf {
    pub block: String,
    pub direction: Direction,
    pub kind: ConnectorKind,
    /// Ordinal of the ref within its kind in this block.
    pub enum_key: usize,
    pub source_ref: SourceRef,
    /// Points of every column the worker reads or emits, `ref_cols` origins included.
    pub points: IndexMap<String, Point>,
    /// Outputs only: `device -> [column]` after expanding list columns.
    pub device_columns: IndexMap<String, Vec<String>>,
}

impl WorkerConf {
    /// Ordered columns an input samples.
    pub fn input_columns(&self) -> Vec<String> {
        self.source_ref.columns.names().into_iter().map(String::from).collect()
    }

    pub fn projection(&self) -> Projection {
        Projection::new(
            self.device_columns.clone(),
            self.source_ref.ref_cols.clone(),
            self.points.clone(),
        )
    }

    pub fn schedule(&self) -> OutputSchedule {
        OutputSchedule::from_source_ref(&self.source_ref)
    }
}

/// Block-scoped unique worker name: `{kind}_{source}_{enum_key}`.
pub fn worker_name(kind: ConnectorKind, source: &str, enum_key: usize) -> String {
    format!("{kind}_{source}_{enum_key}")
}

#[derive(Debug)]
pub struct WorkerCore {
    pub name: String,
    pub block: String,
    pub worker_key: ConnectorKind,
    pub enum_key: usize,
    pub target: Target,
    pub time_interval: Duration,
    pub ref_cols: Vec<RefCol>,
    status: bool,
    span: Span,
}

impl WorkerCore {
    /// Validate the identity and timing fields of `conf`.
    pub fn set_conf(conf: &WorkerConf) -> Result<Self, SettingInvalid> {
        let source = &conf.source_ref.source;
        if !Pattern::StringKey.matches_str(source) {
            return Err(SettingInvalid::new("source", format!("{source:?} is not a string_key")));
        }
        if conf.enum_key >= MAX_REFS_PER_KIND {
            return Err(SettingInvalid::new(
                "enum_key",
                format!("{} exceeds the {MAX_REFS_PER_KIND} refs allowed per kind", conf.enum_key),
            ));
        }
        if conf.source_ref.time_interval == 0 {
            return Err(SettingInvalid::new("time_interval", "must be a positive integer"));
        }

        let name = worker_name(conf.kind, source, conf.enum_key);
        let span = WorkerBound {
            block: &conf.block,
            worker: &name,
            kind: conf.kind.as_str(),
            direction: conf.direction.as_str(),
        }
        .span("worker");

        Ok(Self {
            name,
            block: conf.block.clone(),
            worker_key: conf.kind,
            enum_key: conf.enum_key,
            target: Target::from(&conf.source_ref),
            time_interval: Duration::from_secs(conf.source_ref.time_interval),
            ref_cols: conf.source_ref.ref_cols.clone(),
            status: false,
            span,
        })
    }

    pub fn source(&self) -> &str {
        &self.target.source
    }

    pub fn status(&self) -> bool {
        self.status
    }

    /// Returns the previous status.
    pub fn set_status(&mut self, status: bool) -> bool {
        std::mem::replace(&mut self.status, status)
    }

    /// Span every event of this worker is recorded under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_configured(&self) -> bool {
        !self.name.is_empty() && !self.time_interval.is_zero()
    }

    pub fn unavailable(&self, error: DriverError) -> WorkerError {
        WorkerError::Unavailable {
            name: self.name.clone(),
            reason: error.to_string(),
        }
    }

    pub fn driver_failure(&self, error: DriverError) -> WorkerError {
        WorkerError::Driver {
            name: self.name.clone(),
            source: error,
        }
    }

    pub fn timed_out(&self, timeout: Duration) -> WorkerError {
        WorkerError::Timeout {
            name: self.name.clone(),
            timeout,
        }
    }
}

#[cfg(test)]
pub(crate) fn conf_for(direction: Direction, kind: ConnectorKind, enum_key: usize, yaml: &str) -> WorkerConf {
    use crate::config::PointType;

    let source_ref: SourceRef = serde_yaml::from_str(yaml).unwrap();
    let float = Point::new(PointType::Int, PointType::Float, 1000);
    let mut points = IndexMap::new();
    for column in source_ref.referenced_columns() {
        points.insert(column.to_string(), float.clone());
    }
    let device_columns = match (&source_ref.columns, direction) {
        (crate::config::Columns::ByDevice(map), _) => map.clone(),
        (crate::config::Columns::List(list), Direction::Output) => {
            IndexMap::from([("bmv700".to_string(), list.clone())])
        }
        (crate::config::Columns::List(_), Direction::Input) => IndexMap::new(),
    };
    WorkerConf {
        block: "batMonitor".to_string(),
        direction,
        kind,
        enum_key,
        source_ref,
        points,
        device_columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_timing() {
        let conf = conf_for(
            Direction::Input,
            ConnectorKind::Serial,
            1,
            "{ source: bmv700, columns: [V], time_interval: 3 }",
        );
        let core = WorkerCore::set_conf(&conf).unwrap();
        assert_eq!(core.name, "serial_bmv700_1");
        assert_eq!(core.time_interval, Duration::from_secs(3));
        assert!(core.is_configured());
        assert!(!core.status());
    }

    #[test]
    fn test_rejects_bad_fields() {
        let zero = conf_for(
            Direction::Input,
            ConnectorKind::Serial,
            0,
            "{ source: bmv700, columns: [V], time_interval: 0 }",
        );
        assert_eq!(WorkerCore::set_conf(&zero).unwrap_err().field, "time_interval");

        let sixth = conf_for(
            Direction::Input,
            ConnectorKind::Serial,
            5,
            "{ source: bmv700, columns: [V], time_interval: 1 }",
        );
        assert_eq!(WorkerCore::set_conf(&sixth).unwrap_err().field, "enum_key");

        let bad_source = conf_for(
            Direction::Input,
            ConnectorKind::Serial,
            0,
            "{ source: _bmv, columns: [V], time_interval: 1 }",
        );
        assert_eq!(WorkerCore::set_conf(&bad_source).unwrap_err().field, "source");
    }

    #[test]
    fn test_set_status_returns_previous() {
        let conf = conf_for(
            Direction::Output,
            ConnectorKind::Redis,
            0,
            "{ source: local, columns: [V], time_interval: 1 }",
        );
        let mut core = WorkerCore::set_conf(&conf).unwrap();
        assert!(!core.set_status(true));
        assert!(core.set_status(false));
    }
}
