// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative schema validation.
//!
//! * `vocabulary` - reusable primitive patterns (`string_key`, `positive_integer`, ...)
//! * `document` - schema document types and their structural checks
//! * `validator` - instance validation with path-carrying errors
//! * `registry` - lazy, size-bounded lookup of bundled schema files

pub mod document;
pub mod registry;
pub mod validator;
pub mod vocabulary;

pub use document::{SchemaDocument, SchemaNode};
pub use registry::SchemaRegistry;
pub use validator::Validator;
pub use vocabulary::Pattern;

/// Schema keys for the top-level configuration sections.
pub mod keys {
    pub const APP_BLOCKS: &str = "appBlocks";
    pub const APP_CONNECTORS: &str = "appConnectors";
    pub const BATTERY_BANKS: &str = "batteryBanks";
    pub const BATTERY_BANK_ARGS: &str = "batteryBankArgs";
    pub const DATA_STRUCTURE: &str = "data_structure";
    pub const IMPORTS: &str = "imports";
}
