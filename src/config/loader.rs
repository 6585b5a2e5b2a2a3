// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Locating, reading and merging configuration documents.
//!
//! A root document is found through a fixed search order:
//!
//! 1. `{base_dir}/{name}` when a base directory is given
//! 2. `/opt/vemonitor/conf/{name}`
//! 3. the parent of the directory holding the running binary
//! 4. `$HOME/.vemonitor/{name}`
//! 5. the current working directory
//!
//! A mapping root may list child files under `Imports`; in a sequence root,
//! each element may list them under `includes`. Children are resolved
//! against the root document's directory and merged into the root. Every
//! file is bounded individually, and the root plus its imports share one
//! cumulative bound.
//!
//! ```yaml
//! Imports:
//!   - connectors.yaml
//!   - data_structure.yaml
//! appBlocks:
//!   - name: batMonitor
//!     ...
//! ```

use serde_yaml::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::consts::{
    CONFIG_EXTENSIONS, IMPORTS_KEY, INCLUDES_KEY, MAX_CONFIG_FILE_SIZE, MAX_CONFIG_TOTAL_SIZE, SYSTEM_CONFIG_DIR,
    USER_CONFIG_DIR,
};
use crate::errors::{ConfigError, VeMonitorResult};
use crate::observability::messages::config::{
    ConfigFileLocated, ConfigLoaded, ImportMerged, ImportSkipped, NestedImportsIgnored,
};
use crate::observability::messages::StructuredLog;
use crate::schema::{keys, SchemaRegistry};

/// A root document with its imports merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub value: Value,
    /// Imports actually merged, in merge order.
    pub imports: Vec<PathBuf>,
    /// Bytes read across the root and its imports.
    pub total_bytes: u64,
}

#[derive(Default)]
pub struct ConfigLoader {
    base_dir: Option<PathBuf>,
    allowed_imports: Option<Vec<String>>,
    schemas: Option<Arc<SchemaRegistry>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `dir` before the standard locations.
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Only load imports whose entry (or file name) appears in `names`.
    pub fn with_allowed_imports<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_imports = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Validate import lists against the `imports` schema.
    pub fn with_schemas(mut self, schemas: Arc<SchemaRegistry>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// Candidate directories, in priority order.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::with_capacity(5);
        if let Some(base) = &self.base_dir {
            dirs.push(base.clone());
        }
        dirs.push(PathBuf::from(SYSTEM_CONFIG_DIR));
        if let Some(grandparent) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().and_then(Path::parent).map(Path::to_path_buf))
        {
            dirs.push(grandparent);
        }
        if let Some(home) = std::env::var_os("HOME") {
            dirs.push(PathBuf::from(home).join(USER_CONFIG_DIR));
        }
        if let Ok(cwd) = std::env::current_dir() {
            dirs.push(cwd);
        }
        dirs
    }

    /// Resolve the first existing file among `names` through the search order.
    pub fn locate(&self, names: &[&str]) -> Result<PathBuf, ConfigError> {
        let dirs = self.search_dirs();
        let mut searched = Vec::new();

        for name in names {
            let direct = Path::new(name);
            if direct.is_absolute() {
                if direct.is_file() {
                    return Ok(located(direct.to_path_buf()));
                }
                searched.push(direct.to_path_buf());
                continue;
            }
            for dir in &dirs {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Ok(located(candidate));
                }
                searched.push(candidate);
            }
        }

        Err(ConfigError::FileNotFound {
            names: names.iter().map(|n| n.to_string()).collect(),
            searched,
        })
    }

    /// Locate the first of `names` and load it with its imports.
    pub fn load(&self, names: &[&str]) -> VeMonitorResult<LoadedDocument> {
        let path = self.locate(names)?;
        self.load_path(path)
    }

    /// Load a root document from an explicit path, merging its imports.
    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> VeMonitorResult<LoadedDocument> {
        let path = path.as_ref().to_path_buf();
        let mut total_bytes = 0;
        let mut value = read_document(&path, &mut total_bytes)?;
        let root_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut imports = Vec::new();
        match &mut value {
            Value::Mapping(root) => {
                if let Some(entries) = root.remove(IMPORTS_KEY) {
                    for import in self.import_paths(&path, &root_dir, &entries)? {
                        let child = self.read_import(&path, &import, &mut total_bytes)?;
                        let mut child_map = match child {
                            Value::Mapping(map) => map,
                            other => return Err(mismatch(import, "mapping", &other).into()),
                        };
                        strip_nested(&import, child_map.remove(IMPORTS_KEY));
                        for (key, child_value) in child_map {
                            root.insert(key, child_value);
                        }
                        imports.push(import);
                    }
                }
            }
            Value::Sequence(root) => {
                let mut appended = Vec::new();
                for element in root.iter_mut() {
                    let Some(entries) = element.as_mapping_mut().and_then(|m| m.remove(INCLUDES_KEY)) else {
                        continue;
                    };
                    for import in self.import_paths(&path, &root_dir, &entries)? {
                        let child = self.read_import(&path, &import, &mut total_bytes)?;
                        let mut items = match child {
                            Value::Sequence(items) => items,
                            other => return Err(mismatch(import, "sequence", &other).into()),
                        };
                        for item in items.iter_mut() {
                            strip_nested(&import, item.as_mapping_mut().and_then(|m| m.remove(INCLUDES_KEY)));
                        }
                        appended.extend(items);
                        imports.push(import);
                    }
                }
                root.extend(appended);
            }
            _ => {}
        }

        ConfigLoaded {
            path: &path.display().to_string(),
            imports: imports.len(),
            total_bytes,
        }
        .log();

        Ok(LoadedDocument {
            path,
            value,
            imports,
            total_bytes,
        })
    }

    /// Import entries of one list, filtered by the allow-list and resolved against `root_dir`.
    fn import_paths(&self, root: &Path, root_dir: &Path, entries: &Value) -> VeMonitorResult<Vec<PathBuf>> {
        if let Some(schemas) = &self.schemas {
            schemas.validate(keys::IMPORTS, entries.clone())?;
        }

        let Value::Sequence(entries) = entries else {
            return Err(ConfigError::InvalidImport {
                root: root.to_path_buf(),
                entry: format!("{entries:?}"),
            }
            .into());
        };

        let mut paths = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(name) = entry.as_str().filter(|n| has_config_extension(Path::new(n))) else {
                return Err(ConfigError::InvalidImport {
                    root: root.to_path_buf(),
                    entry: format!("{entry:?}"),
                }
                .into());
            };
            if !self.is_allowed(name) {
                ImportSkipped {
                    root: &root.display().to_string(),
                    import: name,
                }
                .log();
                continue;
            }
            let candidate = Path::new(name);
            paths.push(if candidate.is_absolute() {
                candidate.to_path_buf()
            } else {
                root_dir.join(candidate)
            });
        }
        Ok(paths)
    }

    fn is_allowed(&self, name: &str) -> bool {
        let Some(allowed) = &self.allowed_imports else {
            return true;
        };
        let file_name = Path::new(name).file_name().and_then(|f| f.to_str());
        allowed.iter().any(|a| a == name || Some(a.as_str()) == file_name)
    }

    fn read_import(&self, root: &Path, import: &Path, total_bytes: &mut u64) -> Result<Value, ConfigError> {
        let before = *total_bytes;
        let child = read_document(import, total_bytes)?;
        ImportMerged {
            root: &root.display().to_string(),
            import: &import.display().to_string(),
            size_bytes: *total_bytes - before,
            total_bytes: *total_bytes,
        }
        .log();
        Ok(child)
    }
}

fn located(path: PathBuf) -> PathBuf {
    let path = std::fs::canonicalize(&path).unwrap_or(path);
    ConfigFileLocated {
        path: &path.display().to_string(),
    }
    .log();
    path
}

fn has_config_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| CONFIG_EXTENSIONS.contains(&e))
}

/// Read and parse one file, charging its size against `total_bytes`.
fn read_document(path: &Path, total_bytes: &mut u64) -> Result<Value, ConfigError> {
    if !has_config_extension(path) {
        return Err(ConfigError::InvalidExtension(path.to_path_buf()));
    }

    let size = std::fs::metadata(path)
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max: MAX_CONFIG_FILE_SIZE,
        });
    }
    if *total_bytes + size > MAX_CONFIG_TOTAL_SIZE {
        return Err(ConfigError::FileTooLarge {
            path: path.to_path_buf(),
            size: *total_bytes + size,
            max: MAX_CONFIG_TOTAL_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if is_empty(&value) {
        return Err(ConfigError::FileEmpty(path.to_path_buf()));
    }

    *total_bytes += size;
    Ok(value)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Mapping(m) => m.is_empty(),
        Value::Sequence(s) => s.is_empty(),
        _ => false,
    }
}

fn strip_nested(import: &Path, nested: Option<Value>) {
    if let Some(nested) = nested {
        NestedImportsIgnored {
            import: &import.display().to_string(),
            count: nested.as_sequence().map_or(1, Vec::len),
        }
        .log();
    }
}

fn shape(value: &Value) -> &'static str {
    match value {
        Value::Mapping(_) => "mapping",
        Value::Sequence(_) => "sequence",
        Value::Null => "null",
        _ => "scalar",
    }
}

fn mismatch(import: PathBuf, expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::ImportTypeMismatch {
        import,
        expected,
        found: shape(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::VeMonitorError;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn config_error(result: VeMonitorResult<LoadedDocument>) -> ConfigError {
        match result {
            Err(VeMonitorError::Config(e)) => e,
            other => panic!("expected a ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn test_locate_prefers_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "vemonitor_conf.yaml", "a: 1\n");
        let loader = ConfigLoader::new().with_base_dir(dir.path());
        let path = loader.locate(&["vemonitor_conf.yaml"]).unwrap();
        assert_eq!(path, std::fs::canonicalize(dir.path().join("vemonitor_conf.yaml")).unwrap());
    }

    #[test]
    fn test_locate_tries_candidates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "second.yml", "a: 1\n");
        let loader = ConfigLoader::new().with_base_dir(dir.path());
        let path = loader.locate(&["first_missing_3f2a.yaml", "second.yml"]).unwrap();
        assert!(path.ends_with("second.yml"));
    }

    #[test]
    fn test_locate_not_found_lists_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::new().with_base_dir(dir.path());
        match loader.locate(&["no_such_file_7c1e.yaml"]) {
            Err(ConfigError::FileNotFound { names, searched }) => {
                assert_eq!(names, vec!["no_such_file_7c1e.yaml"]);
                assert_eq!(searched[0], dir.path().join("no_such_file_7c1e.yaml"));
                assert_eq!(searched[1], Path::new(SYSTEM_CONFIG_DIR).join("no_such_file_7c1e.yaml"));
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "conf.json", "{}");
        let err = config_error(ConfigLoader::new().load_path(path));
        assert!(matches!(err, ConfigError::InvalidExtension(_)));
    }

    #[test]
    fn test_rejects_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "empty.yaml", "# nothing here\n");
        let err = config_error(ConfigLoader::new().load_path(path));
        assert!(matches!(err, ConfigError::FileEmpty(_)));
    }

    #[test]
    fn test_rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = "a: 1\n".to_string();
        body.push_str(&"#".repeat(MAX_CONFIG_FILE_SIZE as usize));
        let path = write(&dir, "big.yaml", &body);
        let err = config_error(ConfigLoader::new().load_path(path));
        assert!(matches!(err, ConfigError::FileTooLarge { max, .. } if max == MAX_CONFIG_FILE_SIZE));
    }

    #[test]
    fn test_cumulative_size_bound() {
        let dir = tempfile::tempdir().unwrap();
        let half = (MAX_CONFIG_TOTAL_SIZE / 2) as usize;
        write(&dir, "a.yaml", &format!("a: 1\n{}\n", "#".repeat(half)));
        write(&dir, "b.yaml", &format!("b: 2\n{}\n", "#".repeat(half)));
        let root = write(&dir, "root.yaml", "Imports: [a.yaml, b.yaml]\nroot: 0\n");

        let err = config_error(ConfigLoader::new().load_path(root));
        match err {
            ConfigError::FileTooLarge { path, size, max } => {
                assert!(path.ends_with("b.yaml"));
                assert!(size > max);
                assert_eq!(max, MAX_CONFIG_TOTAL_SIZE);
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_mapping_imports_merge_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "a.yaml", "shared: from_a\nonly_a: 1\n");
        let root = write(&dir, "root.yaml", "Imports: [a.yaml]\nshared: from_root\nonly_root: 2\n");

        let doc = ConfigLoader::new().load_path(root).unwrap();
        let map = doc.value.as_mapping().unwrap();
        assert_eq!(map.get("shared").and_then(Value::as_str), Some("from_a"));
        assert!(map.contains_key("only_a"));
        assert!(map.contains_key("only_root"));
        assert!(!map.contains_key(IMPORTS_KEY));
        assert_eq!(doc.imports.len(), 1);
    }

    #[test]
    fn test_import_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "a.yaml", "from_a: 1\n");
        write(&dir, "b.yaml", "from_b: 2\n");
        let root = write(&dir, "root.yaml", "Imports: [a.yaml, b.yaml]\nfrom_root: 0\n");

        let doc = ConfigLoader::new()
            .with_allowed_imports(["a.yaml"])
            .load_path(root)
            .unwrap();
        let map = doc.value.as_mapping().unwrap();
        assert!(map.contains_key("from_root"));
        assert!(map.contains_key("from_a"));
        assert!(!map.contains_key("from_b"));
    }

    #[test]
    fn test_import_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "list.yaml", "- 1\n- 2\n");
        let root = write(&dir, "root.yaml", "Imports: [list.yaml]\nkey: 0\n");

        let err = config_error(ConfigLoader::new().load_path(root));
        assert!(matches!(
            err,
            ConfigError::ImportTypeMismatch { expected: "mapping", found: "sequence", .. }
        ));
    }

    #[test]
    fn test_sequence_includes_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "more.yaml", "- name: third\n- name: fourth\n");
        let root = write(
            &dir,
            "root.yaml",
            "- name: first\n  includes: [more.yaml]\n- name: second\n",
        );

        let doc = ConfigLoader::new().load_path(root).unwrap();
        let names: Vec<&str> = doc
            .value
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|e| e.get("name").and_then(Value::as_str))
            .collect();
        assert_eq!(names, vec!["first", "second", "third", "fourth"]);
        assert!(doc.value[0].get(INCLUDES_KEY).is_none());
    }

    #[test]
    fn test_sequence_include_must_be_sequence() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "map.yaml", "a: 1\n");
        let root = write(&dir, "root.yaml", "- name: first\n  includes: [map.yaml]\n");

        let err = config_error(ConfigLoader::new().load_path(root));
        assert!(matches!(
            err,
            ConfigError::ImportTypeMismatch { expected: "sequence", found: "mapping", .. }
        ));
    }

    #[test]
    fn test_nested_imports_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "deep.yaml", "deep: 1\n");
        write(&dir, "a.yaml", "Imports: [deep.yaml]\nfrom_a: 1\n");
        let root = write(&dir, "root.yaml", "Imports: [a.yaml]\nfrom_root: 0\n");

        let doc = ConfigLoader::new().load_path(root).unwrap();
        let map = doc.value.as_mapping().unwrap();
        assert!(map.contains_key("from_a"));
        assert!(!map.contains_key("deep"));
        assert!(!map.contains_key(IMPORTS_KEY));
    }

    #[test]
    fn test_invalid_import_entry() {
        let dir = tempfile::tempdir().unwrap();
        let root = write(&dir, "root.yaml", "Imports: [notes.txt]\nkey: 0\n");
        let err = config_error(ConfigLoader::new().load_path(root));
        assert!(matches!(err, ConfigError::InvalidImport { entry, .. } if entry.contains("notes.txt")));
    }

    #[test]
    fn test_reload_of_reserialized_document_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "a.yaml", "appConnectors: { redis: { local: { host: 127.0.0.1, port: 6379 } } }\n");
        let root = write(&dir, "root.yaml", "Imports: [a.yaml]\nname: site\nlimits: [1, 2.5, x]\n");
        let first = ConfigLoader::new().load_path(root).unwrap();

        let out = tempfile::tempdir().unwrap();
        let reserialized = write(&out, "merged.yaml", &serde_yaml::to_string(&first.value).unwrap());
        let second = ConfigLoader::new().load_path(reserialized).unwrap();

        assert_eq!(first.value, second.value);
    }
}
