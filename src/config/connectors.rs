// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The `appConnectors` catalogue: `kind -> instance -> settings`.
//!
//! Settings are resolved into a typed variant per kind when the catalogue
//! is built, so workers never inspect raw mappings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::config::blocks::{ConnectorKind, Sources};
use crate::config::consts::{DEFAULT_SERIAL_BAUD, DEFAULT_SERIAL_TIMEOUT};
use crate::errors::SettingInvalid;

/// Token in `serial_port` replaced by `$HOME`.
pub const HOME_TOKEN: &str = "/${HOME}";

fn default_baud() -> u32 {
    DEFAULT_SERIAL_BAUD
}

fn default_timeout() -> u64 {
    DEFAULT_SERIAL_TIMEOUT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSettings {
    pub serial_port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Read timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Expected device identity, checked on the first readiness probe.
    #[serde(default)]
    pub serial_test: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStoreSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub db: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    pub addr: String,
    pub apikey: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// Settings of one connector instance, resolved by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConnectorSettings {
    Serial(SerialSettings),
    CacheStore(CacheStoreSettings),
    Http(HttpSettings),
}

impl ConnectorSettings {
    /// Resolve a raw settings mapping for `kind`.
    pub fn resolve(kind: ConnectorKind, field: &str, raw: Value, home: Option<&str>) -> Result<Self, SettingInvalid> {
        let invalid = |e: serde_yaml::Error| SettingInvalid::new(field, e.to_string());
        match kind {
            ConnectorKind::Serial => {
                let mut settings: SerialSettings = serde_yaml::from_value(raw).map_err(invalid)?;
                settings.serial_port = expand_home(&settings.serial_port, home)
                    .ok_or_else(|| SettingInvalid::new(format!("{field}.serial_port"), "HOME is not set"))?;
                Ok(ConnectorSettings::Serial(settings))
            }
            ConnectorKind::Redis => serde_yaml::from_value(raw).map(ConnectorSettings::CacheStore).map_err(invalid),
            ConnectorKind::InfluxDb2 | ConnectorKind::Emoncms => {
                serde_yaml::from_value(raw).map(ConnectorSettings::Http).map_err(invalid)
            }
        }
    }

    pub fn active(&self) -> Option<bool> {
        match self {
            ConnectorSettings::Serial(s) => s.active,
            ConnectorSettings::CacheStore(s) => s.active,
            ConnectorSettings::Http(s) => s.active,
        }
    }

    /// A copy without the transient `active` flag, as handed to drivers.
    pub fn without_transient(&self) -> Self {
        let mut settings = self.clone();
        match &mut settings {
            ConnectorSettings::Serial(s) => s.active = None,
            ConnectorSettings::CacheStore(s) => s.active = None,
            ConnectorSettings::Http(s) => s.active = None,
        }
        settings
    }

    pub fn as_serial(&self) -> Option<&SerialSettings> {
        match self {
            ConnectorSettings::Serial(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_cache_store(&self) -> Option<&CacheStoreSettings> {
        match self {
            ConnectorSettings::CacheStore(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_http(&self) -> Option<&HttpSettings> {
        match self {
            ConnectorSettings::Http(s) => Some(s),
            _ => None,
        }
    }
}

/// Replace the `/${HOME}` token with `home`. `None` when the token is present but `home` is not.
pub fn expand_home(port: &str, home: Option<&str>) -> Option<String> {
    if !port.contains(HOME_TOKEN) {
        return Some(port.to_string());
    }
    let home = home?.trim_end_matches('/');
    Some(port.replace(HOME_TOKEN, home))
}

/// The `appConnectors` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AppConnectors(IndexMap<ConnectorKind, IndexMap<String, ConnectorSettings>>);

impl AppConnectors {
    /// Build from a schema-validated value, expanding `/${HOME}` from the environment.
    pub fn from_value(value: &Value) -> Result<Self, SettingInvalid> {
        let home = std::env::var("HOME").ok();
        Self::from_value_with_home(value, home.as_deref())
    }

    pub fn from_value_with_home(value: &Value, home: Option<&str>) -> Result<Self, SettingInvalid> {
        let Value::Mapping(kinds) = value else {
            return Err(SettingInvalid::new("appConnectors", "expected a mapping"));
        };

        let mut catalogue = IndexMap::new();
        for (kind_key, instances) in kinds {
            let kind_name = kind_key.as_str().unwrap_or_default();
            let kind = ConnectorKind::from_key(kind_name)
                .ok_or_else(|| SettingInvalid::new("appConnectors", format!("unknown connector kind {kind_key:?}")))?;
            let Value::Mapping(instances) = instances else {
                return Err(SettingInvalid::new(format!("appConnectors.{kind}"), "expected a mapping"));
            };

            let mut resolved = IndexMap::new();
            for (name, raw) in instances {
                let name = name
                    .as_str()
                    .ok_or_else(|| SettingInvalid::new(format!("appConnectors.{kind}"), "instance names must be strings"))?;
                let field = format!("appConnectors.{kind}.{name}");
                let settings = ConnectorSettings::resolve(kind, &field, raw.clone(), home)?;
                resolved.insert(name.to_string(), settings);
            }
            catalogue.insert(kind, resolved);
        }
        Ok(Self(catalogue))
    }

    pub fn has(&self, kind: ConnectorKind, instance: &str) -> bool {
        self.get(kind, instance).is_some()
    }

    pub fn get(&self, kind: ConnectorKind, instance: &str) -> Option<&ConnectorSettings> {
        self.0.get(&kind).and_then(|instances| instances.get(instance))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ConnectorKind> + '_ {
        self.0.keys().copied()
    }

    pub fn instances(&self, kind: ConnectorKind) -> impl Iterator<Item = (&str, &ConnectorSettings)> {
        self.0
            .get(&kind)
            .into_iter()
            .flat_map(|instances| instances.iter().map(|(name, s)| (name.as_str(), s)))
    }

    /// Number of connector instances across all kinds.
    pub fn len(&self) -> usize {
        self.0.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the instances named in `sources`, preserving catalogue order.
    pub fn reduce(&self, sources: &Sources) -> Self {
        let mut reduced = IndexMap::new();
        for (kind, instances) in &self.0 {
            let Some(wanted) = sources.get(kind) else {
                continue;
            };
            let kept: IndexMap<String, ConnectorSettings> = instances
                .iter()
                .filter(|(name, _)| wanted.contains(name.as_str()))
                .map(|(name, s)| (name.clone(), s.clone()))
                .collect();
            if !kept.is_empty() {
                reduced.insert(*kind, kept);
            }
        }
        Self(reduced)
    }

    pub fn to_value(&self) -> Value {
        serde_yaml::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    const CATALOGUE: &str = r#"
serial:
  bmv700:
    serial_port: /${HOME}/dev/ttyUSB0
    serial_test: { PID: "0x203" }
    active: true
  mppt1:
    serial_port: /dev/ttyUSB1
    baud: 9600
    timeout: 2
redis:
  local: { host: 127.0.0.1, port: 6379 }
influxDb2:
  influx: { addr: "http://localhost:8086", apikey: secret, org: home }
emoncms:
  emon: { addr: "https://emoncms.org", apikey: abc, node_prefix: solar }
"#;

    fn catalogue() -> AppConnectors {
        let value: Value = serde_yaml::from_str(CATALOGUE).unwrap();
        AppConnectors::from_value_with_home(&value, Some("/home/pi")).unwrap()
    }

    #[test]
    fn test_resolves_variant_per_kind() {
        let c = catalogue();
        let serial = c.get(ConnectorKind::Serial, "mppt1").unwrap().as_serial().unwrap();
        assert_eq!(serial.baud, 9600);
        assert_eq!(serial.timeout, 2);

        let redis = c.get(ConnectorKind::Redis, "local").unwrap().as_cache_store().unwrap();
        assert_eq!(redis.port, 6379);
        assert_eq!(redis.db, 0);

        let emon = c.get(ConnectorKind::Emoncms, "emon").unwrap().as_http().unwrap();
        assert_eq!(emon.extra.get("node_prefix"), Some(&Value::String("solar".into())));
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn test_serial_defaults() {
        let c = catalogue();
        let serial = c.get(ConnectorKind::Serial, "bmv700").unwrap().as_serial().unwrap();
        assert_eq!(serial.baud, 19_200);
        assert_eq!(serial.timeout, 1);
        assert_eq!(serial.serial_test.get("PID").map(String::as_str), Some("0x203"));
    }

    #[test]
    fn test_home_token_expanded() {
        let c = catalogue();
        let serial = c.get(ConnectorKind::Serial, "bmv700").unwrap().as_serial().unwrap();
        assert_eq!(serial.serial_port, "/home/pi/dev/ttyUSB0");

        assert_eq!(expand_home("/dev/ttyUSB0", None), Some("/dev/ttyUSB0".to_string()));
        assert_eq!(expand_home("/${HOME}/tty", Some("/root/")), Some("/root/tty".to_string()));
        assert_eq!(expand_home("/${HOME}/tty", None), None);
    }

    #[test]
    fn test_home_token_without_home_is_setting_invalid() {
        let value: Value = serde_yaml::from_str("serial: { a: { serial_port: '/${HOME}/tty', serial_test: { PID: '0x203' } } }").unwrap();
        let err = AppConnectors::from_value_with_home(&value, None).unwrap_err();
        assert_eq!(err.field, "appConnectors.serial.a.serial_port");
    }

    #[test]
    fn test_without_transient_strips_active() {
        let c = catalogue();
        let settings = c.get(ConnectorKind::Serial, "bmv700").unwrap();
        assert_eq!(settings.active(), Some(true));
        assert_eq!(settings.without_transient().active(), None);
    }

    #[test]
    fn test_missing_required_field_is_setting_invalid() {
        let value: Value = serde_yaml::from_str("redis: { local: { host: 127.0.0.1 } }").unwrap();
        let err = AppConnectors::from_value_with_home(&value, None).unwrap_err();
        assert_eq!(err.field, "appConnectors.redis.local");
    }

    #[test]
    fn test_reduce_keeps_only_referenced() {
        let c = catalogue();
        let sources: Sources = BTreeMap::from([
            (ConnectorKind::Serial, BTreeSet::from(["bmv700".to_string()])),
            (ConnectorKind::Redis, BTreeSet::from(["local".to_string()])),
        ]);
        let reduced = c.reduce(&sources);
        assert_eq!(reduced.len(), 2);
        assert!(reduced.has(ConnectorKind::Serial, "bmv700"));
        assert!(!reduced.has(ConnectorKind::Serial, "mppt1"));
        assert!(!reduced.has(ConnectorKind::InfluxDb2, "influx"));
        assert_eq!(reduced.kinds().collect::<Vec<_>>(), vec![ConnectorKind::Serial, ConnectorKind::Redis]);
    }
}
