// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Lazily loaded registry of named schema documents.
//!
//! The registry scans a directory for `{key}_schema.json` files once, and
//! parses each document the first time its key is requested.

use parking_lot::RwLock;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::consts::{MAX_SCHEMA_FILE_SIZE, SCHEMA_DIR, SCHEMA_FILE_SUFFIX};
use crate::errors::{SchemaError, VeMonitorResult};
use crate::observability::messages::config::{SchemaLoaded, SchemaRejected};
use crate::observability::messages::StructuredLog;
use crate::schema::document::SchemaDocument;
use crate::schema::validator::Validator;

pub struct SchemaRegistry {
    dir: PathBuf,
    files: HashMap<String, PathBuf>,
    loaded: RwLock<HashMap<String, Arc<SchemaDocument>>>,
}

impl SchemaRegistry {
    /// Register every `{key}_schema.json` file found in `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, SchemaError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir).map_err(|_| SchemaError::NotFound(dir.clone()))?;

        let mut files = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(key) = file_name.strip_suffix(SCHEMA_FILE_SUFFIX) {
                if !key.is_empty() {
                    files.insert(key.to_string(), path.clone());
                }
            }
        }

        Ok(Self {
            dir,
            files,
            loaded: RwLock::new(HashMap::new()),
        })
    }

    /// Open the bundled `schemas/` directory.
    ///
    /// Looks next to the running binary first, then in the crate source tree.
    pub fn bundled() -> Result<Self, SchemaError> {
        let beside_binary = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join(SCHEMA_DIR)));
        let source_tree = Path::new(env!("CARGO_MANIFEST_DIR")).join(SCHEMA_DIR);

        for candidate in beside_binary.into_iter().chain(std::iter::once(source_tree.clone())) {
            if candidate.is_dir() {
                return Self::open(candidate);
            }
        }
        Err(SchemaError::NotFound(source_tree))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.files.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Fetch a schema, loading and checking it on first use.
    pub fn get(&self, key: &str) -> Result<Arc<SchemaDocument>, SchemaError> {
        if let Some(doc) = self.loaded.read().get(key) {
            return Ok(Arc::clone(doc));
        }

        let path = self
            .files
            .get(key)
            .ok_or_else(|| SchemaError::UnknownSchema(key.to_string()))?;

        let doc = match load_schema_file(key, path) {
            Ok(doc) => Arc::new(doc),
            Err(error) => {
                SchemaRejected {
                    key,
                    path: &path.display().to_string(),
                    error: &error,
                }
                .log();
                return Err(error);
            }
        };

        self.loaded.write().insert(key.to_string(), Arc::clone(&doc));
        Ok(doc)
    }

    /// Validate `value` against the schema named `key`, handing the document back unchanged.
    pub fn validate(&self, key: &str, value: Value) -> VeMonitorResult<Value> {
        let doc = self.get(key)?;
        Validator::new(&doc).validate(key, &value)?;
        Ok(value)
    }
}

fn load_schema_file(key: &str, path: &Path) -> Result<SchemaDocument, SchemaError> {
    let size = std::fs::metadata(path)
        .map_err(|_| SchemaError::NotFound(path.to_path_buf()))?
        .len();
    if size > MAX_SCHEMA_FILE_SIZE {
        return Err(SchemaError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: MAX_SCHEMA_FILE_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|_| SchemaError::NotFound(path.to_path_buf()))?;
    let doc: SchemaDocument = serde_json::from_str(&content).map_err(|e| SchemaError::Malformed {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    doc.check(key)?;

    SchemaLoaded {
        key,
        path: &path.display().to_string(),
        size_bytes: size,
    }
    .log();

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::VeMonitorError;
    use tempfile::TempDir;

    const SMALL_SCHEMA: &str = r#"{ "schema": { "type": "list", "items": { "type": "string", "pattern": "string_import" } } }"#;

    fn registry_with(files: &[(&str, String)]) -> (TempDir, SchemaRegistry) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        let registry = SchemaRegistry::open(dir.path()).unwrap();
        (dir, registry)
    }

    fn padded(size: usize) -> String {
        let mut body = SMALL_SCHEMA.to_string();
        body.push_str(&" ".repeat(size - body.len()));
        body
    }

    #[test]
    fn test_scans_schema_files_only() {
        let (_dir, registry) = registry_with(&[
            ("imports_schema.json", SMALL_SCHEMA.to_string()),
            ("notes.txt", "ignored".to_string()),
        ]);
        assert_eq!(registry.keys(), vec!["imports"]);
        assert!(registry.contains("imports"));
    }

    #[test]
    fn test_unknown_key() {
        let (_dir, registry) = registry_with(&[]);
        assert!(matches!(registry.get("appBlocks"), Err(SchemaError::UnknownSchema(k)) if k == "appBlocks"));
    }

    #[test]
    fn test_exactly_max_size_loads() {
        let (_dir, registry) = registry_with(&[("imports_schema.json", padded(MAX_SCHEMA_FILE_SIZE as usize))]);
        assert!(registry.get("imports").is_ok());
    }

    #[test]
    fn test_one_byte_over_max_size_is_schema_error() {
        let (_dir, registry) = registry_with(&[("imports_schema.json", padded(MAX_SCHEMA_FILE_SIZE as usize + 1))]);
        assert!(matches!(registry.get("imports"), Err(SchemaError::TooLarge { .. })));
    }

    #[test]
    fn test_malformed_schema_reported_before_data() {
        let (_dir, registry) = registry_with(&[("imports_schema.json", "{ not json".to_string())]);
        let result = registry.validate("imports", Value::Null);
        assert!(matches!(result, Err(VeMonitorError::Schema(SchemaError::Malformed { .. }))));
    }

    #[test]
    fn test_validate_twice_is_a_no_op() {
        let (_dir, registry) = registry_with(&[("imports_schema.json", SMALL_SCHEMA.to_string())]);
        let value: Value = serde_yaml::from_str("[a.yaml, b.yml]").unwrap();
        let once = registry.validate("imports", value.clone()).unwrap();
        let twice = registry.validate("imports", once.clone()).unwrap();
        assert_eq!(once, value);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_validation_error_carries_path() {
        let (_dir, registry) = registry_with(&[("imports_schema.json", SMALL_SCHEMA.to_string())]);
        let value: Value = serde_yaml::from_str("[a.yaml, b.json]").unwrap();
        match registry.validate("imports", value) {
            Err(VeMonitorError::Validation(err)) => {
                assert_eq!(err.path, "imports[1]");
                assert_eq!(err.expected, "string_import");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_directory() {
        assert!(matches!(
            SchemaRegistry::open("/nonexistent/vemonitor/schemas"),
            Err(SchemaError::NotFound(_))
        ));
    }

    #[test]
    fn test_bundled_schemas_all_load() {
        let registry = SchemaRegistry::bundled().unwrap();
        for key in ["appBlocks", "appConnectors", "batteryBanks", "batteryBankArgs", "data_structure", "imports"] {
            assert!(registry.get(key).is_ok(), "bundled schema '{key}' failed to load");
        }
    }
}
