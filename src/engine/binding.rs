// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turns a block's source refs into bound workers.

use indexmap::IndexMap;

use crate::config::{AppConnectors, Block, Columns, ConnectorKind, ConnectorSettings, DataStructures, SourceRef};
use crate::errors::{SettingInvalid, VeMonitorResult};
use crate::observability::messages::worker::WorkerBound;
use crate::observability::messages::StructuredLog;
use crate::traits::Worker;
use crate::workers::{ActiveConnectors, Direction, WorkerConf, WorkerRegistry, Workers};

/// Instantiate one worker per source ref of `block`.
///
/// `enum_key` is the ref's ordinal within its kind. Connector settings come
/// from the reduced catalogue, so a ref to an inactive instance fails here.
pub fn bind_block(
    block: &Block,
    connectors: &AppConnectors,
    data: &DataStructures,
    registry: &WorkerRegistry,
    active: &ActiveConnectors,
) -> VeMonitorResult<Workers> {
    let mut workers = Workers::default();

    for (kind, refs) in &block.inputs {
        for (enum_key, source_ref) in refs.iter().enumerate() {
            let settings = settings_for(block, Direction::Input, *kind, enum_key, source_ref, connectors)?;
            let conf = worker_conf(block, Direction::Input, *kind, enum_key, source_ref, data, IndexMap::new());
            let worker = registry.build_input(&conf, settings)?;
            let name = worker.name().to_string();
            announce(block, &name, *kind, Direction::Input, active);
            workers.inputs.add(name, worker)?;
        }
    }

    for (kind, refs) in &block.outputs {
        for (enum_key, source_ref) in refs.iter().enumerate() {
            let settings = settings_for(block, Direction::Output, *kind, enum_key, source_ref, connectors)?;
            let device_columns = device_columns(block, source_ref);
            let conf = worker_conf(block, Direction::Output, *kind, enum_key, source_ref, data, device_columns);
            let worker = registry.build_output(&conf, settings)?;
            let name = worker.name().to_string();
            announce(block, &name, *kind, Direction::Output, active);
            workers.outputs.add(name, worker)?;
        }
    }

    Ok(workers)
}

/// `device -> [column]` an output subscribes to.
///
/// A list is expanded to every input device of the block, each device
/// keeping only the listed columns it produces. A device that only feeds a
/// `ref_cols` origin is subscribed with an empty selection.
pub fn device_columns(block: &Block, source_ref: &SourceRef) -> IndexMap<String, Vec<String>> {
    match &source_ref.columns {
        Columns::ByDevice(map) => map.clone(),
        Columns::List(list) => {
            let mut expanded = IndexMap::new();
            for device in block.input_devices() {
                let produced = block.input_columns_of(device);
                let selected: Vec<String> = list
                    .iter()
                    .filter(|c| produced.contains(&c.as_str()))
                    .cloned()
                    .collect();
                let feeds_rename = source_ref
                    .ref_cols
                    .iter()
                    .any(|pair| produced.contains(&pair.origin.as_str()));
                if !selected.is_empty() || feeds_rename {
                    expanded.insert(device.to_string(), selected);
                }
            }
            expanded
        }
    }
}

fn settings_for<'a>(
    block: &Block,
    direction: Direction,
    kind: ConnectorKind,
    enum_key: usize,
    source_ref: &SourceRef,
    connectors: &'a AppConnectors,
) -> Result<&'a ConnectorSettings, SettingInvalid> {
    connectors.get(kind, &source_ref.source).ok_or_else(|| {
        SettingInvalid::new(
            format!("{}.{direction}s.{kind}[{enum_key}].source", block.name),
            format!("no active {kind} connector named {:?}", source_ref.source),
        )
    })
}

fn worker_conf(
    block: &Block,
    direction: Direction,
    kind: ConnectorKind,
    enum_key: usize,
    source_ref: &SourceRef,
    data: &DataStructures,
    device_columns: IndexMap<String, Vec<String>>,
) -> WorkerConf {
    WorkerConf {
        block: block.name.clone(),
        direction,
        kind,
        enum_key,
        source_ref: source_ref.clone(),
        points: data.input_structure(source_ref.referenced_columns()),
        device_columns,
    }
}

fn announce(block: &Block, worker: &str, kind: ConnectorKind, direction: Direction, active: &ActiveConnectors) {
    WorkerBound {
        block: &block.name,
        worker,
        kind: kind.as_str(),
        direction: direction.as_str(),
    }
    .log();
    active.register(&block.name, kind, worker, direction);
}
