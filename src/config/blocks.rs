// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::ValidationError;

/// Kind of physical connector a source ref cites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnectorKind {
    #[serde(rename = "serial")]
    Serial,
    #[serde(rename = "redis")]
    Redis,
    #[serde(rename = "influxDb2")]
    InfluxDb2,
    #[serde(rename = "emoncms")]
    Emoncms,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 4] = [
        ConnectorKind::Serial,
        ConnectorKind::Redis,
        ConnectorKind::InfluxDb2,
        ConnectorKind::Emoncms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorKind::Serial => "serial",
            ConnectorKind::Redis => "redis",
            ConnectorKind::InfluxDb2 => "influxDb2",
            ConnectorKind::Emoncms => "emoncms",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    /// Whether samples can be read from this kind.
    pub fn is_source(&self) -> bool {
        matches!(self, ConnectorKind::Serial | ConnectorKind::Redis)
    }

    /// Whether samples can be written to this kind.
    pub fn is_sink(&self) -> bool {
        matches!(self, ConnectorKind::Redis | ConnectorKind::InfluxDb2 | ConnectorKind::Emoncms)
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Columns of a source ref: a flat list, or (outputs only) grouped by input device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Columns {
    List(Vec<String>),
    ByDevice(IndexMap<String, Vec<String>>),
}

impl Default for Columns {
    fn default() -> Self {
        Columns::List(Vec::new())
    }
}

impl Columns {
    /// Every distinct column name, in first-seen order.
    pub fn names(&self) -> Vec<&str> {
        fn push<'a>(c: &'a str, names: &mut Vec<&'a str>) {
            if !names.contains(&c) {
                names.push(c);
            }
        }

        let mut names: Vec<&str> = Vec::new();
        match self {
            Columns::List(list) => list.iter().for_each(|c| push(c.as_str(), &mut names)),
            Columns::ByDevice(map) => map
                .values()
                .flatten()
                .for_each(|c| push(c.as_str(), &mut names)),
        }
        names
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Columns::List(list) => list.is_empty(),
            Columns::ByDevice(map) => map.values().all(Vec::is_empty),
        }
    }
}

/// One `[rename, origin]` pair: the emitted column `rename` takes the value of `origin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct RefCol {
    pub rename: String,
    pub origin: String,
}

impl TryFrom<Vec<String>> for RefCol {
    type Error = String;

    fn try_from(pair: Vec<String>) -> Result<Self, Self::Error> {
        match <[String; 2]>::try_from(pair) {
            Ok([rename, origin]) => Ok(Self { rename, origin }),
            Err(pair) => Err(format!("ref_cols entries must have exactly 2 items, found {}", pair.len())),
        }
    }
}

impl From<RefCol> for Vec<String> {
    fn from(pair: RefCol) -> Self {
        vec![pair.rename, pair.origin]
    }
}

/// One endpoint of a block's wiring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Connector instance name within its kind.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    #[serde(rename = "mesurement", alias = "measurement", default, skip_serializing_if = "Option::is_none")]
    pub measurement: Option<String>,
    #[serde(default)]
    pub columns: Columns,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ref_cols: Vec<RefCol>,
    pub time_interval: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_req_interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_clock_skew: Option<u64>,
}

impl SourceRef {
    /// Columns this ref needs from the point catalogue: its own plus `ref_cols` origins.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut names = self.columns.names();
        for pair in &self.ref_cols {
            if !names.contains(&pair.origin.as_str()) {
                names.push(pair.origin.as_str());
            }
        }
        names
    }
}

/// Middleware bindings of a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockArgs {
    #[serde(rename = "batteryBanks", default, skip_serializing_if = "Option::is_none")]
    pub battery_banks: Option<String>,
    #[serde(flatten)]
    pub other: IndexMap<String, serde_yaml::Value>,
}

pub type Wiring = IndexMap<ConnectorKind, Vec<SourceRef>>;

/// A named pipeline binding inputs to outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub app: String,
    #[serde(default)]
    pub args: BlockArgs,
    #[serde(default)]
    pub inputs: Wiring,
    #[serde(default)]
    pub outputs: Wiring,
    /// Reserved for a cache-backed reader; carried but not wired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_cache: Option<serde_yaml::Value>,
}

/// `{kind -> {instance...}}` actually referenced by one or more blocks.
pub type Sources = BTreeMap<ConnectorKind, BTreeSet<String>>;

impl Block {
    pub fn sources(&self) -> Sources {
        let mut sources = Sources::new();
        for (kind, refs) in self.inputs.iter().chain(self.outputs.iter()) {
            let entry = sources.entry(*kind).or_default();
            entry.extend(refs.iter().map(|r| r.source.clone()));
        }
        sources
    }

    /// Every column the block reads or emits, including `ref_cols` origins.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for refs in self.inputs.values().chain(self.outputs.values()) {
            for r in refs {
                for c in r.referenced_columns() {
                    if !columns.contains(&c) {
                        columns.push(c);
                    }
                }
            }
        }
        columns
    }

    /// Columns produced by the given input device (connector instance) of this block.
    pub fn input_columns_of(&self, device: &str) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for r in self.inputs.values().flatten().filter(|r| r.source == device) {
            for c in r.columns.names() {
                if !columns.contains(&c) {
                    columns.push(c);
                }
            }
        }
        columns
    }

    /// Distinct input devices in declaration order.
    pub fn input_devices(&self) -> Vec<&str> {
        let mut devices: Vec<&str> = Vec::new();
        for r in self.inputs.values().flatten() {
            if !devices.contains(&r.source.as_str()) {
                devices.push(r.source.as_str());
            }
        }
        devices
    }

    /// Every output column must be produced by an input of this same block.
    pub fn check_outputs_fed(&self, path: &str) -> Result<(), ValidationError> {
        let produced: BTreeSet<&str> = self
            .inputs
            .values()
            .flatten()
            .flat_map(|r| r.columns.names())
            .collect();

        for (kind, refs) in &self.outputs {
            for (i, r) in refs.iter().enumerate() {
                let ref_path = format!("{path}.outputs.{kind}[{i}]");
                match &r.columns {
                    Columns::List(list) => {
                        for (j, c) in list.iter().enumerate() {
                            if !produced.contains(c.as_str()) {
                                return Err(unfed(format!("{ref_path}.columns[{j}]"), c));
                            }
                        }
                    }
                    Columns::ByDevice(map) => {
                        for (device, list) in map {
                            let from_device = self.input_columns_of(device);
                            for (j, c) in list.iter().enumerate() {
                                if !from_device.contains(&c.as_str()) {
                                    return Err(unfed(format!("{ref_path}.columns.{device}[{j}]"), c));
                                }
                            }
                        }
                    }
                }
                for (j, pair) in r.ref_cols.iter().enumerate() {
                    if !produced.contains(pair.origin.as_str()) {
                        return Err(unfed(format!("{ref_path}.ref_cols[{j}]"), &pair.origin));
                    }
                }
            }
        }
        Ok(())
    }
}

fn unfed(path: String, column: &str) -> ValidationError {
    ValidationError::new(path, "a column produced by an input of the same block", format!("string {column:?}"))
}

/// The `appBlocks` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppBlocks(pub Vec<Block>);

impl AppBlocks {
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Block> {
        self.0.first()
    }

    pub fn by_name(&self, name: &str) -> Option<&Block> {
        self.0.iter().find(|b| b.name == name)
    }

    /// First block running the given app.
    pub fn by_app(&self, app: &str) -> Option<&Block> {
        self.0.iter().find(|b| b.app == app)
    }

    /// Union of every block's sources.
    pub fn sources(&self) -> Sources {
        let mut all = Sources::new();
        for block in &self.0 {
            for (kind, instances) in block.sources() {
                all.entry(kind).or_default().extend(instances);
            }
        }
        all
    }

    /// Every column referenced by any block.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for c in self.0.iter().flat_map(Block::columns) {
            if !columns.contains(&c) {
                columns.push(c);
            }
        }
        columns
    }

    /// Block names are unique and every output is fed by its block's inputs.
    pub fn check(&self) -> Result<(), ValidationError> {
        let mut seen = BTreeSet::new();
        for (i, block) in self.0.iter().enumerate() {
            let path = format!("appBlocks[{i}]");
            if !seen.insert(block.name.as_str()) {
                return Err(ValidationError::new(
                    format!("{path}.name"),
                    "unique block name",
                    format!("duplicate {:?}", block.name),
                ));
            }
            block.check_outputs_fed(&path)?;
        }
        Ok(())
    }

    pub fn retain(&mut self, names: &[&str]) {
        self.0.retain(|b| names.contains(&b.name.as_str()));
    }
}
