// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors about schema documents themselves, raised before any data is inspected.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema file too large: {path} is {size} bytes (max: {max} bytes)")]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("malformed schema '{key}': {reason}")]
    Malformed { key: String, reason: String },

    #[error("schema file not found: {0}")]
    NotFound(PathBuf),

    #[error("unknown schema '{0}'")]
    UnknownSchema(String),
}

/// An instance failed validation.
///
/// `path` locates the failing node (`appBlocks[0].inputs.serial[1].columns`),
/// `expected` names the rule or vocabulary pattern it broke.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("validation failed at '{path}': expected {expected}, found {found}")]
pub struct ValidationError {
    pub path: String,
    pub expected: String,
    pub found: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}
