// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Containers for the workers bound to blocks.

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::ConnectorKind;
use crate::errors::SettingInvalid;
use crate::traits::{InputWorker, OutputWorker};
use crate::workers::core::Direction;

/// Workers of one direction keyed by their block-scoped name, in insertion order.
pub struct WorkersDict<W: ?Sized>(IndexMap<String, Box<W>>);

impl<W: ?Sized> Default for WorkersDict<W> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<W: ?Sized> WorkersDict<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `worker` under `name`. Names are unique within a block.
    pub fn add(&mut self, name: impl Into<String>, worker: Box<W>) -> Result<(), SettingInvalid> {
        let name = name.into();
        if self.0.contains_key(&name) {
            return Err(SettingInvalid::new(name, "a worker with this name is already registered"));
        }
        self.0.insert(name, worker);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&W> {
        self.0.get(name).map(|w| w.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut W> {
        self.0.get_mut(name).map(|w| w.as_mut())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &W)> {
        self.0.iter().map(|(k, w)| (k.as_str(), w.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<W: ?Sized> IntoIterator for WorkersDict<W> {
    type Item = (String, Box<W>);
    type IntoIter = indexmap::map::IntoIter<String, Box<W>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The two disjoint worker sets of one block.
#[derive(Default)]
pub struct Workers {
    pub inputs: WorkersDict<dyn InputWorker>,
    pub outputs: WorkersDict<dyn OutputWorker>,
}

impl Workers {
    pub fn len(&self) -> usize {
        self.inputs.len() + self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// One physical connector bound by a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundConnector {
    pub worker: String,
    pub direction: Direction,
    pub status: bool,
}

/// `(block, kind) -> [bound connector]`, readable without touching the workers.
#[derive(Debug, Clone, Default)]
pub struct ActiveConnectors(Arc<Mutex<IndexMap<(String, ConnectorKind), Vec<BoundConnector>>>>);

impl ActiveConnectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, block: &str, kind: ConnectorKind, worker: &str, direction: Direction) {
        let mut map = self.0.lock();
        let bound = map.entry((block.to_string(), kind)).or_default();
        if !bound.iter().any(|b| b.worker == worker && b.direction == direction) {
            bound.push(BoundConnector {
                worker: worker.to_string(),
                direction,
                status: false,
            });
        }
    }

    /// Returns false when the worker was never registered.
    ///
    /// An input and an output may share a name, so entries match on name and direction.
    pub fn set_status(&self, block: &str, kind: ConnectorKind, worker: &str, direction: Direction, status: bool) -> bool {
        let mut map = self.0.lock();
        let Some(bound) = map.get_mut(&(block.to_string(), kind)) else {
            return false;
        };
        match bound.iter_mut().find(|b| b.worker == worker && b.direction == direction) {
            Some(entry) => {
                entry.status = status;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, block: &str, kind: ConnectorKind) -> Vec<BoundConnector> {
        self.0
            .lock()
            .get(&(block.to_string(), kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Kinds bound by `block`, in registration order.
    pub fn kinds_of(&self, block: &str) -> Vec<ConnectorKind> {
        self.0
            .lock()
            .keys()
            .filter(|(b, _)| b == block)
            .map(|(_, kind)| *kind)
            .collect()
    }

    pub fn ready_count(&self, block: &str) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|((b, _), _)| b == block)
            .flat_map(|(_, bound)| bound)
            .filter(|b| b.status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dict_rejects_duplicate_names() {
        let mut dict: WorkersDict<str> = WorkersDict::new();
        dict.add("serial_bmv700_0", "a".into()).unwrap();
        dict.add("redis_local_0", "b".into()).unwrap();
        let err = dict.add("serial_bmv700_0", "c".into()).unwrap_err();
        assert_eq!(err.field, "serial_bmv700_0");

        assert_eq!(dict.names().collect::<Vec<_>>(), vec!["serial_bmv700_0", "redis_local_0"]);
        assert_eq!(dict.get("redis_local_0"), Some("b"));
    }

    #[test]
    fn test_active_connectors_track_status() {
        let active = ActiveConnectors::new();
        active.register("batMonitor", ConnectorKind::Serial, "serial_bmv700_0", Direction::Input);
        active.register("batMonitor", ConnectorKind::Redis, "redis_local_0", Direction::Output);
        active.register("solar", ConnectorKind::Serial, "serial_mppt1_0", Direction::Input);

        assert!(active.set_status("batMonitor", ConnectorKind::Serial, "serial_bmv700_0", Direction::Input, true));
        assert!(!active.set_status("batMonitor", ConnectorKind::Serial, "serial_mppt1_0", Direction::Input, true));
        assert!(!active.set_status("batMonitor", ConnectorKind::Serial, "serial_bmv700_0", Direction::Output, true));

        assert_eq!(active.kinds_of("batMonitor"), vec![ConnectorKind::Serial, ConnectorKind::Redis]);
        assert_eq!(active.ready_count("batMonitor"), 1);
        assert_eq!(active.ready_count("solar"), 0);
        assert_eq!(active.get("batMonitor", ConnectorKind::Redis)[0].direction, Direction::Output);
    }

    #[test]
    fn test_input_and_output_sharing_a_name_are_tracked_apart() {
        let active = ActiveConnectors::new();
        active.register("relay", ConnectorKind::Redis, "redis_local_0", Direction::Input);
        active.register("relay", ConnectorKind::Redis, "redis_local_0", Direction::Output);
        active.register("relay", ConnectorKind::Redis, "redis_local_0", Direction::Output);

        assert!(active.set_status("relay", ConnectorKind::Redis, "redis_local_0", Direction::Output, true));

        let bound = active.get("relay", ConnectorKind::Redis);
        assert_eq!(bound.len(), 2);
        assert_eq!((bound[0].direction, bound[0].status), (Direction::Input, false));
        assert_eq!((bound[1].direction, bound[1].status), (Direction::Output, true));
    }
}
