// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration loading and schema events.
//!
//! This module contains message types for logging events related to:
//! * Locating the root configuration file
//! * Resolving and merging imports
//! * Loading bundled schema documents
//! * Reducing the connector catalogue to the active blocks

use crate::observability::messages::StructuredLog;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Root configuration file resolved through the search order.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ConfigFileLocated<'a> {
    pub path: &'a str,
}

impl Display for ConfigFileLocated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Using configuration file {}", self.path)
    }
}

impl StructuredLog for ConfigFileLocated<'_> {
    fn log(&self) {
        tracing::info!(path = self.path, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("config_file", span_name = name, path = self.path)
    }
}

/// An import was read and merged into its root document.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ImportMerged<'a> {
    pub root: &'a str,
    pub import: &'a str,
    pub size_bytes: u64,
    pub total_bytes: u64,
}

impl Display for ImportMerged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Merged import {} into {} ({} bytes, {} bytes total)",
            self.import, self.root, self.size_bytes, self.total_bytes
        )
    }
}

impl StructuredLog for ImportMerged<'_> {
    fn log(&self) {
        tracing::debug!(
            root = self.root,
            import = self.import,
            size_bytes = self.size_bytes,
            total_bytes = self.total_bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "import_merged",
            span_name = name,
            root = self.root,
            import = self.import,
        )
    }
}

/// An import was not loaded because the caller's allow-list omits it.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ImportSkipped<'a> {
    pub root: &'a str,
    pub import: &'a str,
}

impl Display for ImportSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Skipping import {} of {}: not in allow-list", self.import, self.root)
    }
}

impl StructuredLog for ImportSkipped<'_> {
    fn log(&self) {
        tracing::debug!(root = self.root, import = self.import, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("import_skipped", span_name = name, import = self.import)
    }
}

/// An imported document declared imports of its own. Only the root's imports are followed.
///
/// # Log Level
/// `warn!` - Potential configuration issue
pub struct NestedImportsIgnored<'a> {
    pub import: &'a str,
    pub count: usize,
}

impl Display for NestedImportsIgnored<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Ignoring {} nested import(s) declared in {}: imports resolve from the root document only",
            self.count, self.import
        )
    }
}

impl StructuredLog for NestedImportsIgnored<'_> {
    fn log(&self) {
        tracing::warn!(import = self.import, count = self.count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("nested_imports", span_name = name, import = self.import)
    }
}

/// Root document and all of its imports loaded.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ConfigLoaded<'a> {
    pub path: &'a str,
    pub imports: usize,
    pub total_bytes: u64,
}

impl Display for ConfigLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded configuration {} with {} import(s), {} bytes",
            self.path, self.imports, self.total_bytes
        )
    }
}

impl StructuredLog for ConfigLoaded<'_> {
    fn log(&self) {
        tracing::info!(
            path = self.path,
            imports = self.imports,
            total_bytes = self.total_bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("config_loaded", span_name = name, path = self.path)
    }
}

/// A schema document was parsed and passed its structural checks.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct SchemaLoaded<'a> {
    pub key: &'a str,
    pub path: &'a str,
    pub size_bytes: u64,
}

impl Display for SchemaLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Loaded schema '{}' from {} ({} bytes)", self.key, self.path, self.size_bytes)
    }
}

impl StructuredLog for SchemaLoaded<'_> {
    fn log(&self) {
        tracing::debug!(
            key = self.key,
            path = self.path,
            size_bytes = self.size_bytes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("schema_loaded", span_name = name, key = self.key)
    }
}

/// A schema document could not be used.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct SchemaRejected<'a> {
    pub key: &'a str,
    pub path: &'a str,
    pub error: &'a dyn Error,
}

impl Display for SchemaRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Rejected schema '{}' at {}: {}", self.key, self.path, self.error)
    }
}

impl StructuredLog for SchemaRejected<'_> {
    fn log(&self) {
        tracing::error!(
            key = self.key,
            path = self.path,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("schema_rejected", span_name = name, key = self.key)
    }
}

/// The connector catalogue was reduced to what the active blocks cite.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ConnectorsReduced {
    pub kept: usize,
    pub dropped: usize,
}

impl Display for ConnectorsReduced {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Connector catalogue reduced to {} instance(s), {} unused",
            self.kept, self.dropped
        )
    }
}

impl StructuredLog for ConnectorsReduced {
    fn log(&self) {
        tracing::info!(kept = self.kept, dropped = self.dropped, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("connectors_reduced", span_name = name, kept = self.kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let merged = ImportMerged {
            root: "/etc/root.yaml",
            import: "a.yaml",
            size_bytes: 10,
            total_bytes: 30,
        };
        assert_eq!(
            merged.to_string(),
            "Merged import a.yaml into /etc/root.yaml (10 bytes, 30 bytes total)"
        );

        let reduced = ConnectorsReduced { kept: 2, dropped: 1 };
        assert_eq!(reduced.to_string(), "Connector catalogue reduced to 2 instance(s), 1 unused");
    }

    #[test]
    fn test_schema_rejected_includes_error() {
        let error = std::io::Error::new(std::io::ErrorKind::Other, "bad json");
        let msg = SchemaRejected {
            key: "appBlocks",
            path: "schemas/appBlocks_schema.json",
            error: &error,
        };
        assert!(msg.to_string().ends_with(": bad json"));
        msg.log();
    }
}
