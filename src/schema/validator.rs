// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Instance validation against a [`SchemaDocument`].
//!
//! Validation stops at the first failing node and reports its path, e.g.
//! `appBlocks[0].inputs.serial` with `expected: "at most 5 items"`.

use serde_yaml::Value;
use std::collections::HashSet;

use crate::errors::ValidationError;
use crate::schema::document::{SchemaDocument, SchemaNode};

pub struct Validator<'a> {
    document: &'a SchemaDocument,
}

impl<'a> Validator<'a> {
    pub fn new(document: &'a SchemaDocument) -> Self {
        Self { document }
    }

    /// Validate `value`, rooting error paths at `root`.
    pub fn validate(&self, root: &str, value: &Value) -> Result<(), ValidationError> {
        self.node(&self.document.schema, value, root)
    }

    fn node(&self, node: &SchemaNode, value: &Value, path: &str) -> Result<(), ValidationError> {
        match node {
            SchemaNode::Any => Ok(()),
            SchemaNode::Ref { name } => match self.document.definition(name) {
                Some(target) => self.node(target, value, path),
                // Refs are resolved by SchemaDocument::check at load time.
                None => Err(ValidationError::new(path, format!("definition '{name}'"), "unresolved ref")),
            },
            SchemaNode::OneOf { variants } => {
                if variants.iter().any(|v| self.node(v, value, path).is_ok()) {
                    Ok(())
                } else {
                    Err(ValidationError::new(path, "one of the declared variants", describe(value)))
                }
            }
            SchemaNode::Boolean => match value {
                Value::Bool(_) => Ok(()),
                other => Err(ValidationError::new(path, "boolean", describe(other))),
            },
            SchemaNode::String { pattern, allowed } => {
                let Value::String(s) = value else {
                    let expected = pattern.map(|p| p.name()).unwrap_or("string");
                    return Err(ValidationError::new(path, expected, describe(value)));
                };
                if let Some(p) = pattern {
                    if !p.matches_str(s) {
                        return Err(ValidationError::new(path, p.name(), describe(value)));
                    }
                }
                if !allowed.is_empty() && !allowed.iter().any(|a| a == s) {
                    return Err(ValidationError::new(
                        path,
                        format!("one of [{}]", allowed.join(", ")),
                        describe(value),
                    ));
                }
                Ok(())
            }
            SchemaNode::Integer { pattern, min, max } => {
                let as_int = match value {
                    Value::Number(n) => n.as_i64(),
                    _ => None,
                };
                let Some(i) = as_int else {
                    let expected = pattern.map(|p| p.name()).unwrap_or("integer");
                    return Err(ValidationError::new(path, expected, describe(value)));
                };
                if let Some(p) = pattern {
                    if !p.matches(value) {
                        return Err(ValidationError::new(path, p.name(), describe(value)));
                    }
                }
                check_range(path, i as f64, min.map(|m| m as f64), max.map(|m| m as f64), value)
            }
            SchemaNode::Number { pattern, min, max } => {
                let as_float = match value {
                    Value::Number(n) => n.as_f64(),
                    _ => None,
                };
                let Some(f) = as_float else {
                    let expected = pattern.map(|p| p.name()).unwrap_or("number");
                    return Err(ValidationError::new(path, expected, describe(value)));
                };
                if let Some(p) = pattern {
                    if !p.matches(value) {
                        return Err(ValidationError::new(path, p.name(), describe(value)));
                    }
                }
                check_range(path, f, *min, *max, value)
            }
            SchemaNode::List {
                items,
                min_items,
                max_items,
                unique,
            } => {
                let Value::Sequence(seq) = value else {
                    return Err(ValidationError::new(path, "list", describe(value)));
                };
                if let Some(lo) = min_items {
                    if seq.len() < *lo {
                        return Err(ValidationError::new(path, format!("at least {lo} items"), describe(value)));
                    }
                }
                if let Some(hi) = max_items {
                    if seq.len() > *hi {
                        return Err(ValidationError::new(path, format!("at most {hi} items"), describe(value)));
                    }
                }
                for (i, item) in seq.iter().enumerate() {
                    self.node(items, item, &format!("{path}[{i}]"))?;
                }
                if *unique {
                    let mut seen = HashSet::new();
                    for (i, item) in seq.iter().enumerate() {
                        let fingerprint = serde_yaml::to_string(item).unwrap_or_default();
                        if !seen.insert(fingerprint) {
                            return Err(ValidationError::new(
                                format!("{path}[{i}]"),
                                "unique items",
                                format!("duplicate {}", describe(item)),
                            ));
                        }
                    }
                }
                Ok(())
            }
            SchemaNode::Map {
                fields,
                required,
                keys,
                values,
                min_entries,
            } => {
                let Value::Mapping(map) = value else {
                    return Err(ValidationError::new(path, "mapping", describe(value)));
                };
                if let Some(lo) = min_entries {
                    if map.len() < *lo {
                        return Err(ValidationError::new(path, format!("at least {lo} entries"), describe(value)));
                    }
                }
                for name in required {
                    if !map.contains_key(name.as_str()) {
                        return Err(ValidationError::new(
                            join_key(path, name),
                            "required field",
                            "nothing",
                        ));
                    }
                }
                for (k, v) in map {
                    let Value::String(key) = k else {
                        return Err(ValidationError::new(path, "string keys", describe(k)));
                    };
                    let child_path = join_key(path, key);
                    if let Some(field) = fields.get(key) {
                        self.node(field, v, &child_path)?;
                        continue;
                    }
                    if keys.is_none() && values.is_none() {
                        if fields.is_empty() {
                            continue;
                        }
                        return Err(ValidationError::new(child_path, "known field", format!("unknown field '{key}'")));
                    }
                    if let Some(key_node) = keys {
                        self.node(key_node, k, &child_path)?;
                    }
                    if let Some(value_node) = values {
                        self.node(value_node, v, &child_path)?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn check_range(path: &str, v: f64, min: Option<f64>, max: Option<f64>, value: &Value) -> Result<(), ValidationError> {
    if let Some(lo) = min {
        if v < lo {
            return Err(ValidationError::new(path, format!(">= {lo}"), describe(value)));
        }
    }
    if let Some(hi) = max {
        if v > hi {
            return Err(ValidationError::new(path, format!("<= {hi}"), describe(value)));
        }
    }
    Ok(())
}

fn join_key(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Short human-readable description of a value for error messages.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Sequence(seq) => format!("list of {} items", seq.len()),
        Value::Mapping(map) => format!("mapping of {} entries", map.len()),
        Value::Tagged(tagged) => format!("tagged value {}", tagged.tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> SchemaDocument {
        let doc: SchemaDocument = serde_json::from_str(json).unwrap();
        doc.check("test").unwrap();
        doc
    }

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    const REF_SCHEMA: &str = r#"{
        "definitions": {
            "source_ref": {
                "type": "map",
                "required": ["source", "columns", "time_interval"],
                "fields": {
                    "source": { "type": "string", "pattern": "string_key" },
                    "columns": { "type": "list", "items": { "type": "string", "pattern": "string_column" }, "min_items": 1, "unique": true },
                    "ref_cols": { "type": "list", "items": { "type": "list", "items": { "type": "string", "pattern": "string_column" }, "min_items": 2, "max_items": 2 } },
                    "time_interval": { "type": "integer", "pattern": "positive_integer" }
                }
            }
        },
        "schema": {
            "type": "map",
            "keys": { "type": "string", "pattern": "string_key" },
            "values": { "type": "list", "items": { "type": "ref", "name": "source_ref" }, "min_items": 1, "max_items": 5 }
        }
    }"#;

    #[test]
    fn test_valid_inputs_pass() {
        let document = doc(REF_SCHEMA);
        let value = yaml(
            r#"
serial:
  - source: bmv700
    columns: [V, I, SOC]
    ref_cols: [[voltage, V]]
    time_interval: 1
"#,
        );
        assert!(Validator::new(&document).validate("inputs", &value).is_ok());
    }

    #[test]
    fn test_six_refs_exceed_limit() {
        let document = doc(REF_SCHEMA);
        let one = "  - { source: s, columns: [V], time_interval: 1 }\n";
        let value = yaml(&format!("serial:\n{}", one.repeat(6)));
        let err = Validator::new(&document).validate("inputs", &value).unwrap_err();
        assert_eq!(err.path, "inputs.serial");
        assert_eq!(err.expected, "at most 5 items");
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let document = doc(REF_SCHEMA);
        let value = yaml("serial:\n  - { source: s, columns: [V, I, V], time_interval: 1 }\n");
        let err = Validator::new(&document).validate("inputs", &value).unwrap_err();
        assert_eq!(err.path, "inputs.serial[0].columns[2]");
        assert_eq!(err.expected, "unique items");
    }

    #[test]
    fn test_ref_cols_pairs_must_have_two_entries() {
        let document = doc(REF_SCHEMA);
        let value = yaml("serial:\n  - { source: s, columns: [V], ref_cols: [[a, b, c]], time_interval: 1 }\n");
        let err = Validator::new(&document).validate("inputs", &value).unwrap_err();
        assert_eq!(err.path, "inputs.serial[0].ref_cols[0]");
        assert_eq!(err.expected, "at most 2 items");
    }

    #[test]
    fn test_pattern_name_reported() {
        let document = doc(REF_SCHEMA);
        let value = yaml("serial:\n  - { source: _bad, columns: [V], time_interval: 1 }\n");
        let err = Validator::new(&document).validate("inputs", &value).unwrap_err();
        assert_eq!(err.path, "inputs.serial[0].source");
        assert_eq!(err.expected, "string_key");
    }

    #[test]
    fn test_time_interval_zero_rejected() {
        let document = doc(REF_SCHEMA);
        let value = yaml("serial:\n  - { source: s, columns: [V], time_interval: 0 }\n");
        let err = Validator::new(&document).validate("inputs", &value).unwrap_err();
        assert_eq!(err.expected, "positive_integer");
    }

    #[test]
    fn test_integral_float_interval_rejected_like_the_pattern() {
        let document = doc(REF_SCHEMA);
        let value = yaml("serial:\n  - { source: s, columns: [V], time_interval: 3.0 }\n");
        let err = Validator::new(&document).validate("inputs", &value).unwrap_err();
        assert_eq!(err.path, "inputs.serial[0].time_interval");
        assert_eq!(err.expected, "positive_integer");
        assert!(!crate::schema::vocabulary::Pattern::PositiveInteger.matches(&yaml("3.0")));
    }

    #[test]
    fn test_missing_required_field() {
        let document = doc(REF_SCHEMA);
        let value = yaml("serial:\n  - { source: s, columns: [V] }\n");
        let err = Validator::new(&document).validate("inputs", &value).unwrap_err();
        assert_eq!(err.path, "inputs.serial[0].time_interval");
        assert_eq!(err.expected, "required field");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let document = doc(REF_SCHEMA);
        let value = yaml("serial:\n  - { source: s, columns: [V], time_interval: 1, colour: red }\n");
        let err = Validator::new(&document).validate("inputs", &value).unwrap_err();
        assert_eq!(err.expected, "known field");
    }

    #[test]
    fn test_one_of_and_allowed_values() {
        let document = doc(
            r#"{ "schema": { "type": "one_of", "variants": [
                { "type": "string", "allowed": ["int", "float"] },
                { "type": "boolean" }
            ] } }"#,
        );
        let validator = Validator::new(&document);
        assert!(validator.validate("t", &yaml("float")).is_ok());
        assert!(validator.validate("t", &yaml("true")).is_ok());
        assert!(validator.validate("t", &yaml("str")).is_err());
    }
}
