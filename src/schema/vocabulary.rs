// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shared vocabulary of primitive field patterns.
//!
//! Schema documents refer to these by name (`"pattern": "string_key"`), so the
//! rules live in exactly one place. Every string pattern rejects non-string
//! values outright: `1`, `null` or a mapping never match `string_key`.

use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;
use std::sync::OnceLock;

/// A named primitive rule from the shared vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Letters/digits/underscore, 1..30 chars, alphanumeric at both ends.
    StringKey,
    /// `string_key` that also accepts `#`.
    StringColumn,
    /// Free text: letters, digits, spaces, `_`, `-`, `/`; alphanumeric first char.
    StringText,
    /// Printable ASCII without whitespace (credentials, tokens).
    StringAuth,
    /// Filesystem path characters, no spaces. Allows the `${HOME}` token.
    StringPath,
    /// `string_key` basename with a `.yaml` / `.yml` extension.
    StringImport,
    /// Host name or IPv4 address.
    StringHost,
    /// `http://` or `https://` address.
    StringUrl,
    /// Numeric and strictly greater than zero.
    PositiveNumber,
    /// Integral and at least one.
    PositiveInteger,
}

const KEY_RE: &str = r"^[A-Za-z0-9](?:[A-Za-z0-9_]{0,28}[A-Za-z0-9])?$";
const COLUMN_RE: &str = r"^[A-Za-z0-9#](?:[A-Za-z0-9_#]{0,28}[A-Za-z0-9#])?$";
const TEXT_RE: &str = r"^[A-Za-z0-9][A-Za-z0-9 _\-/]{0,254}$";
const AUTH_RE: &str = r"^[!-~]+$";
const PATH_RE: &str = r"^[A-Za-z0-9_\-./~${}]+$";
const IMPORT_RE: &str = r"^[A-Za-z0-9](?:[A-Za-z0-9_]{0,28}[A-Za-z0-9])?\.ya?ml$";
const HOST_RE: &str = r"^[A-Za-z0-9](?:[A-Za-z0-9.\-]{0,252}[A-Za-z0-9])?$";
const URL_RE: &str = r"^https?://[!-~]+$";

fn compiled(cell: &'static OnceLock<Regex>, source: &'static str) -> &'static Regex {
    // Constant sources, exercised by test_every_regex_compiles.
    cell.get_or_init(|| Regex::new(source).unwrap_or_else(|e| panic!("bad vocabulary regex {source}: {e}")))
}

impl Pattern {
    pub const ALL: [Pattern; 10] = [
        Pattern::StringKey,
        Pattern::StringColumn,
        Pattern::StringText,
        Pattern::StringAuth,
        Pattern::StringPath,
        Pattern::StringImport,
        Pattern::StringHost,
        Pattern::StringUrl,
        Pattern::PositiveNumber,
        Pattern::PositiveInteger,
    ];

    /// The name schema documents use for this pattern.
    pub fn name(&self) -> &'static str {
        match self {
            Pattern::StringKey => "string_key",
            Pattern::StringColumn => "string_column",
            Pattern::StringText => "string_text",
            Pattern::StringAuth => "string_auth",
            Pattern::StringPath => "string_path",
            Pattern::StringImport => "string_import",
            Pattern::StringHost => "string_host",
            Pattern::StringUrl => "string_url",
            Pattern::PositiveNumber => "positive_number",
            Pattern::PositiveInteger => "positive_integer",
        }
    }

    fn regex(&self) -> Option<&'static Regex> {
        static KEY: OnceLock<Regex> = OnceLock::new();
        static COLUMN: OnceLock<Regex> = OnceLock::new();
        static TEXT: OnceLock<Regex> = OnceLock::new();
        static AUTH: OnceLock<Regex> = OnceLock::new();
        static PATH: OnceLock<Regex> = OnceLock::new();
        static IMPORT: OnceLock<Regex> = OnceLock::new();
        static HOST: OnceLock<Regex> = OnceLock::new();
        static URL: OnceLock<Regex> = OnceLock::new();

        match self {
            Pattern::StringKey => Some(compiled(&KEY, KEY_RE)),
            Pattern::StringColumn => Some(compiled(&COLUMN, COLUMN_RE)),
            Pattern::StringText => Some(compiled(&TEXT, TEXT_RE)),
            Pattern::StringAuth => Some(compiled(&AUTH, AUTH_RE)),
            Pattern::StringPath => Some(compiled(&PATH, PATH_RE)),
            Pattern::StringImport => Some(compiled(&IMPORT, IMPORT_RE)),
            Pattern::StringHost => Some(compiled(&HOST, HOST_RE)),
            Pattern::StringUrl => Some(compiled(&URL, URL_RE)),
            Pattern::PositiveNumber | Pattern::PositiveInteger => None,
        }
    }

    /// Whether this pattern constrains strings (as opposed to numbers).
    pub fn is_string(&self) -> bool {
        self.regex().is_some()
    }

    /// Check a raw string against a string pattern. Numeric patterns never match strings.
    pub fn matches_str(&self, candidate: &str) -> bool {
        self.regex().is_some_and(|re| re.is_match(candidate))
    }

    /// Check an arbitrary document value.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Pattern::PositiveNumber => match value {
                Value::Number(n) => n.as_f64().is_some_and(|f| f.is_finite() && f > 0.0),
                _ => false,
            },
            Pattern::PositiveInteger => match value {
                Value::Number(n) => n.as_u64().is_some_and(|u| u >= 1),
                _ => false,
            },
            _ => match value {
                Value::String(s) => self.matches_str(s),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
