// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative schema documents.
//!
//! A schema file is JSON of the form:
//!
//! ```json
//! {
//!   "description": "block list",
//!   "definitions": { "source_ref": { "type": "map", "fields": { ... } } },
//!   "schema": { "type": "list", "items": { "type": "ref", "name": "block" } }
//! }
//! ```
//!
//! Nodes are tagged by `type`. String and numeric nodes may name a
//! [`Pattern`] from the shared vocabulary.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::errors::SchemaError;
use crate::schema::vocabulary::Pattern;

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub definitions: IndexMap<String, SchemaNode>,
    pub schema: SchemaNode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaNode {
    String {
        pattern: Option<Pattern>,
        #[serde(default)]
        allowed: Vec<String>,
    },
    Integer {
        pattern: Option<Pattern>,
        min: Option<i64>,
        max: Option<i64>,
    },
    Number {
        pattern: Option<Pattern>,
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
    List {
        items: Box<SchemaNode>,
        min_items: Option<usize>,
        max_items: Option<usize>,
        #[serde(default)]
        unique: bool,
    },
    /// Known `fields` are checked by name; any other key must satisfy
    /// `keys` / `values` when those are given, and is rejected otherwise
    /// (unless the map declares no fields at all).
    Map {
        #[serde(default)]
        fields: IndexMap<String, SchemaNode>,
        #[serde(default)]
        required: Vec<String>,
        keys: Option<Box<SchemaNode>>,
        values: Option<Box<SchemaNode>>,
        min_entries: Option<usize>,
    },
    Ref {
        name: String,
    },
    OneOf {
        variants: Vec<SchemaNode>,
    },
    Any,
}

impl SchemaDocument {
    /// Structural checks run once at load time, before any data is inspected.
    pub fn check(&self, key: &str) -> Result<(), SchemaError> {
        for (name, node) in &self.definitions {
            self.check_node(key, node)
                .map_err(|reason| malformed(key, format!("definition '{name}': {reason}")))?;
        }
        self.check_node(key, &self.schema)
            .map_err(|reason| malformed(key, reason))
    }

    fn check_node(&self, key: &str, node: &SchemaNode) -> Result<(), String> {
        match node {
            SchemaNode::String { pattern, .. } => match pattern {
                Some(p) if !p.is_string() => Err(format!("{p} is not a string pattern")),
                _ => Ok(()),
            },
            SchemaNode::Integer { pattern, min, max } => {
                if let Some(p) = pattern {
                    if p.is_string() {
                        return Err(format!("{p} is not a numeric pattern"));
                    }
                }
                match (min, max) {
                    (Some(lo), Some(hi)) if lo > hi => Err(format!("min {lo} exceeds max {hi}")),
                    _ => Ok(()),
                }
            }
            SchemaNode::Number { pattern, min, max } => {
                if let Some(p) = pattern {
                    if p.is_string() {
                        return Err(format!("{p} is not a numeric pattern"));
                    }
                }
                match (min, max) {
                    (Some(lo), Some(hi)) if lo > hi => Err(format!("min {lo} exceeds max {hi}")),
                    _ => Ok(()),
                }
            }
            SchemaNode::List {
                items,
                min_items,
                max_items,
                ..
            } => {
                if let (Some(lo), Some(hi)) = (min_items, max_items) {
                    if lo > hi {
                        return Err(format!("min_items {lo} exceeds max_items {hi}"));
                    }
                }
                self.check_node(key, items)
            }
            SchemaNode::Map {
                fields,
                required,
                keys,
                values,
                ..
            } => {
                for name in required {
                    if !fields.contains_key(name) {
                        return Err(format!("required field '{name}' is not declared"));
                    }
                }
                for child in fields.values() {
                    self.check_node(key, child)?;
                }
                if let Some(k) = keys {
                    if !matches!(**k, SchemaNode::String { .. }) {
                        return Err("map keys must be a string node".to_string());
                    }
                }
                if let Some(v) = values {
                    self.check_node(key, v)?;
                }
                Ok(())
            }
            SchemaNode::Ref { name } => {
                if self.definitions.contains_key(name) {
                    Ok(())
                } else {
                    Err(format!("unresolved ref '{name}'"))
                }
            }
            SchemaNode::OneOf { variants } => {
                if variants.is_empty() {
                    return Err("one_of without variants".to_string());
                }
                variants.iter().try_for_each(|v| self.check_node(key, v))
            }
            SchemaNode::Boolean | SchemaNode::Any => Ok(()),
        }
    }

    pub fn definition(&self, name: &str) -> Option<&SchemaNode> {
        self.definitions.get(name)
    }
}

fn malformed(key: &str, reason: String) -> SchemaError {
    SchemaError::Malformed {
        key: key.to_string(),
        reason,
    }
}
