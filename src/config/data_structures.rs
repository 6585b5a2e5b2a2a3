// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::MissingPointError;

/// Declared type of a point on the wire or in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointType {
    Int,
    Float,
    #[serde(alias = "string")]
    Str,
    Bool,
}

/// A single sampled value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PointValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PointValue::Int(i) => Some(*i as f64),
            PointValue::Float(f) => Some(*f),
            PointValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            PointValue::Text(_) => None,
        }
    }
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointValue::Bool(b) => write!(f, "{b}"),
            PointValue::Int(i) => write!(f, "{i}"),
            PointValue::Float(x) => write!(f, "{x}"),
            PointValue::Text(s) => f.write_str(s),
        }
    }
}

fn default_floatpoint() -> u32 {
    1
}

/// Schema entry for one measurement column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub input_type: PointType,
    pub output_type: PointType,
    /// Raw numeric values are divided by this scale when emitted as floats.
    #[serde(default = "default_floatpoint")]
    pub floatpoint: u32,
}

impl Point {
    pub fn new(input_type: PointType, output_type: PointType, floatpoint: u32) -> Self {
        Self {
            input_type,
            output_type,
            floatpoint: floatpoint.max(1),
        }
    }

    /// Decode a raw text field (as read off a serial frame) into a typed value.
    ///
    /// Returns `None` when the text does not parse as `input_type`.
    pub fn decode(&self, raw: &str) -> Option<PointValue> {
        let raw = raw.trim();
        let parsed = match self.input_type {
            PointType::Int => PointValue::Int(raw.parse().ok()?),
            PointType::Float => PointValue::Float(raw.parse().ok()?),
            PointType::Str => PointValue::Text(raw.to_string()),
            PointType::Bool => PointValue::Bool(parse_bool(raw)?),
        };
        Some(self.cast(parsed))
    }

    /// Convert an input-typed value to `output_type`, applying `floatpoint`.
    pub fn cast(&self, value: PointValue) -> PointValue {
        let scale = f64::from(self.floatpoint.max(1));
        match (self.output_type, value) {
            (PointType::Float, v) => match v.as_f64() {
                Some(x) => PointValue::Float(x / scale),
                None => v,
            },
            (PointType::Int, PointValue::Int(i)) if self.floatpoint <= 1 => PointValue::Int(i),
            (PointType::Int, v) => match v.as_f64() {
                Some(x) => PointValue::Int((x / scale).round() as i64),
                None => v,
            },
            (PointType::Str, v) => PointValue::Text(v.to_string()),
            (PointType::Bool, v) => match v {
                PointValue::Text(s) => parse_bool(&s).map(PointValue::Bool).unwrap_or(PointValue::Text(s)),
                other => PointValue::Bool(other.as_f64().is_some_and(|x| x != 0.0)),
            },
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// A device family and the points it is known to report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub points: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The `data_structure` section: device families and the point catalogue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStructures {
    #[serde(default)]
    pub devices: IndexMap<String, Device>,
    pub points: IndexMap<String, Point>,
}

impl DataStructures {
    pub fn point(&self, column: &str) -> Option<&Point> {
        self.points.get(column)
    }

    /// Columns without a point, in first-seen order and without repeats.
    pub fn missing_columns<'a, I>(&self, columns: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut missing: Vec<String> = Vec::new();
        for column in columns {
            if !self.points.contains_key(column) && !missing.iter().any(|m| m == column) {
                missing.push(column.to_string());
            }
        }
        missing
    }

    pub fn ensure_columns<'a, I>(&self, columns: I) -> Result<(), MissingPointError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let missing = self.missing_columns(columns);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingPointError { missing })
        }
    }

    /// The slice of `points` covering `columns`, in the order given.
    pub fn input_structure<'a, I>(&self, columns: I) -> IndexMap<String, Point>
    where
        I: IntoIterator<Item = &'a str>,
    {
        columns
            .into_iter()
            .filter_map(|c| self.points.get(c).map(|p| (c.to_string(), p.clone())))
            .collect()
    }

    /// Devices whose point list contains every one of `columns`.
    pub fn devices_with<'a>(&'a self, columns: &'a [&'a str]) -> impl Iterator<Item = &'a str> + 'a {
        self.devices
            .iter()
            .filter(move |(_, d)| columns.iter().all(|c| d.points.iter().any(|p| p == c)))
            .map(|(name, _)| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structures() -> DataStructures {
        serde_yaml::from_str(
            r#"
devices:
  bmv700:
    points: [V, I, SOC]
  mppt:
    points: [V, VPV, PPV]
points:
  V: { input_type: int, output_type: float, floatpoint: 1000 }
  I: { input_type: int, output_type: float, floatpoint: 1000 }
  SOC: { input_type: int, output_type: float, floatpoint: 10 }
  PID: { input_type: str, output_type: str }
  LOAD: { input_type: bool, output_type: bool }
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_decode_scales_to_float() {
        let ds = structures();
        assert_eq!(ds.point("V").unwrap().decode("12850"), Some(PointValue::Float(12.85)));
        assert_eq!(ds.point("SOC").unwrap().decode("875"), Some(PointValue::Float(87.5)));
    }

    #[test]
    fn test_decode_text_and_bool() {
        let ds = structures();
        assert_eq!(ds.point("PID").unwrap().decode("0x203"), Some(PointValue::Text("0x203".into())));
        assert_eq!(ds.point("LOAD").unwrap().decode("ON"), Some(PointValue::Bool(true)));
        assert_eq!(ds.point("LOAD").unwrap().decode("OFF"), Some(PointValue::Bool(false)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let ds = structures();
        assert_eq!(ds.point("V").unwrap().decode("twelve"), None);
    }

    #[test]
    fn test_floatpoint_defaults_to_one() {
        let ds = structures();
        assert_eq!(ds.point("PID").unwrap().floatpoint, 1);
    }

    #[test]
    fn test_missing_columns_reported_once() {
        let ds = structures();
        assert_eq!(ds.missing_columns(["V", "P", "I", "P", "CE"]), vec!["P", "CE"]);
        let err = ds.ensure_columns(["V", "P"]).unwrap_err();
        assert_eq!(err.missing, vec!["P"]);
    }

    #[test]
    fn test_input_structure_keeps_order() {
        let ds = structures();
        let structure = ds.input_structure(["SOC", "V", "nope"]);
        assert_eq!(structure.keys().collect::<Vec<_>>(), vec!["SOC", "V"]);
    }

    #[test]
    fn test_devices_with() {
        let ds = structures();
        let devices: Vec<&str> = ds.devices_with(&["V"]).collect();
        assert_eq!(devices, vec!["bmv700", "mppt"]);
        let devices: Vec<&str> = ds.devices_with(&["SOC"]).collect();
        assert_eq!(devices, vec!["bmv700"]);
    }

    #[test]
    fn test_point_value_untagged_round_trip() {
        let values: Vec<PointValue> = serde_yaml::from_str("[true, 3, 2.5, text]").unwrap();
        assert_eq!(
            values,
            vec![
                PointValue::Bool(true),
                PointValue::Int(3),
                PointValue::Float(2.5),
                PointValue::Text("text".into())
            ]
        );
    }
}
