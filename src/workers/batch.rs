// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Rows, batches, and the per-output column projection.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::time::Duration;

use crate::config::{Point, PointValue, RefCol};

/// One sample from one input device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRow {
    pub device: String,
    pub time: DateTime<Utc>,
    pub values: IndexMap<String, PointValue>,
}

/// Rows handed to an output in one `send_data` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    pub rows: Vec<BatchRow>,
    /// Age of the newest row when the batch was assembled.
    pub offset: Duration,
}

impl Batch {
    /// Wrap `rows`, measuring the offset from the newest row to `now`.
    pub fn new(rows: Vec<BatchRow>, now: DateTime<Utc>) -> Self {
        let offset = rows
            .iter()
            .map(|r| r.time)
            .max()
            .and_then(|newest| (now - newest).to_std().ok())
            .unwrap_or(Duration::ZERO);
        Self { rows, offset }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct column names across all rows, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for name in self.rows.iter().flat_map(|r| r.values.keys()) {
            if !columns.contains(&name.as_str()) {
                columns.push(name);
            }
        }
        columns
    }
}

/// What one output takes from each input device, and under which names.
///
/// Selection comes first: a row keeps only the columns listed for its
/// device. Each `[rename, origin]` pair then adds `rename` with the
/// origin's value; the origin itself survives only when it was selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    columns: IndexMap<String, Vec<String>>,
    ref_cols: Vec<RefCol>,
    points: IndexMap<String, Point>,
}

impl Projection {
    /// `points` must cover every selected column and every `ref_cols` origin.
    pub fn new(columns: IndexMap<String, Vec<String>>, ref_cols: Vec<RefCol>, points: IndexMap<String, Point>) -> Self {
        Self {
            columns,
            ref_cols,
            points,
        }
    }

    /// `device -> [column]` this output subscribes to.
    pub fn columns(&self) -> &IndexMap<String, Vec<String>> {
        &self.columns
    }

    pub fn ref_cols(&self) -> &[RefCol] {
        &self.ref_cols
    }

    pub fn subscribes(&self, device: &str) -> bool {
        self.columns.contains_key(device)
    }

    /// Project one input row. `None` when the device is not subscribed or nothing survives.
    pub fn project(&self, row: &BatchRow) -> Option<BatchRow> {
        let selected = self.columns.get(&row.device)?;

        let mut values: IndexMap<String, PointValue> = selected
            .iter()
            .filter_map(|c| row.values.get(c).map(|v| (c.clone(), v.clone())))
            .collect();
        for pair in &self.ref_cols {
            if let Some(v) = row.values.get(&pair.origin) {
                values.insert(pair.rename.clone(), v.clone());
            }
        }

        if values.is_empty() {
            return None;
        }
        Some(BatchRow {
            device: row.device.clone(),
            time: row.time,
            values,
        })
    }

    /// The input column an emitted name was taken from.
    pub fn origin_of<'a>(&'a self, column: &'a str) -> &'a str {
        self.ref_cols
            .iter()
            .find(|pair| pair.rename == column)
            .map(|pair| pair.origin.as_str())
            .unwrap_or(column)
    }

    /// The slice of points covering the columns present in `batch`, keyed by emitted name.
    pub fn input_structure(&self, batch: &Batch) -> IndexMap<String, Point> {
        batch
            .columns()
            .into_iter()
            .filter_map(|c| self.points.get(self.origin_of(c)).map(|p| (c.to_string(), p.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PointType;
    use chrono::TimeZone;

    fn row(device: &str, secs: i64, values: &[(&str, f64)]) -> BatchRow {
        BatchRow {
            device: device.to_string(),
            time: Utc.timestamp_opt(secs, 0).unwrap(),
            values: values
                .iter()
                .map(|(k, v)| (k.to_string(), PointValue::Float(*v)))
                .collect(),
        }
    }

    fn projection() -> Projection {
        let float = Point::new(PointType::Int, PointType::Float, 1000);
        Projection::new(
            IndexMap::from([("bmv700".to_string(), vec!["V".to_string(), "SOC".to_string()])]),
            vec![RefCol {
                rename: "current".into(),
                origin: "I".into(),
            }],
            IndexMap::from([
                ("V".to_string(), float.clone()),
                ("SOC".to_string(), Point::new(PointType::Int, PointType::Float, 10)),
                ("I".to_string(), float),
            ]),
        )
    }

    #[test]
    fn test_selection_then_rename() {
        let p = projection();
        let out = p
            .project(&row("bmv700", 10, &[("V", 12.8), ("I", -1.5), ("SOC", 87.5), ("CE", -2.0)]))
            .unwrap();
        assert_eq!(out.values.keys().collect::<Vec<_>>(), vec!["V", "SOC", "current"]);
        assert_eq!(out.values["current"], PointValue::Float(-1.5));
    }

    #[test]
    fn test_unsubscribed_device_is_skipped() {
        let p = projection();
        assert!(p.project(&row("mppt1", 10, &[("V", 12.8)])).is_none());
        assert!(p.project(&row("bmv700", 10, &[("CE", 1.0)])).is_none());
    }

    #[test]
    fn test_offset_measured_from_newest_row() {
        let now = Utc.timestamp_opt(20, 0).unwrap();
        let batch = Batch::new(vec![row("a", 10, &[("V", 1.0)]), row("a", 15, &[("V", 1.0)])], now);
        assert_eq!(batch.offset, Duration::from_secs(5));

        let future = Batch::new(vec![row("a", 30, &[("V", 1.0)])], now);
        assert_eq!(future.offset, Duration::ZERO);
    }

    #[test]
    fn test_input_structure_follows_renames() {
        let p = projection();
        let projected = p.project(&row("bmv700", 10, &[("V", 12.8), ("I", -1.5)])).unwrap();
        let batch = Batch::new(vec![projected], Utc.timestamp_opt(10, 0).unwrap());
        let structure = p.input_structure(&batch);
        assert_eq!(structure.keys().collect::<Vec<_>>(), vec!["V", "current"]);
        assert_eq!(structure["current"].floatpoint, 1000);
    }
}
