// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating, reading and merging configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// None of the candidate paths in the search order exists.
    #[error("configuration file not found: {names:?} (searched {searched:?})")]
    FileNotFound {
        names: Vec<String>,
        searched: Vec<PathBuf>,
    },

    /// A single file, or the running total of a root and its imports, is over the bound.
    #[error("configuration too large: {path} is {size} bytes (max: {max} bytes)")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    /// The document parsed to null or to an empty container.
    #[error("configuration file is empty: {0}")]
    FileEmpty(PathBuf),

    #[error("configuration file must have a .yaml or .yml extension: {0}")]
    InvalidExtension(PathBuf),

    /// An import entry is not a `name.yaml` / `name.yml` string.
    #[error("invalid import entry in {root}: {entry}")]
    InvalidImport { root: PathBuf, entry: String },

    /// An import's top-level shape differs from the root document's.
    #[error("import {import} is a {found}, expected a {expected} like its root document")]
    ImportTypeMismatch {
        import: PathBuf,
        expected: &'static str,
        found: &'static str,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A required field is missing or has the wrong type at model level.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid setting '{field}': {reason}")]
pub struct SettingInvalid {
    pub field: String,
    pub reason: String,
}

impl SettingInvalid {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Blocks reference columns that have no entry in `data_structure.points`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("columns missing from data_structure.points: {}", missing.join(", "))]
pub struct MissingPointError {
    pub missing: Vec<String>,
}
