// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_yaml::Value;
use std::sync::Arc;

use crate::config::battery_banks::{BatteryBankArgs, BatteryBanks, BatteryBanksSection};
use crate::config::blocks::{AppBlocks, Sources};
use crate::config::connectors::AppConnectors;
use crate::config::data_structures::DataStructures;
use crate::config::loader::ConfigLoader;
use crate::errors::{SettingInvalid, ValidationError, VeMonitorResult};
use crate::observability::messages::config::ConnectorsReduced;
use crate::observability::messages::StructuredLog;
use crate::schema::{keys, SchemaRegistry};

/// Typed, cross-checked view over a validated configuration document.
///
/// Sections are optional while the value is being populated; every setter
/// validates its section against its schema, then re-runs the cross-checks
/// that involve the sections already present:
///
/// * every block `source` names an instance of its connector kind
/// * every block column has a point in `data_structure.points`
/// * every output column is produced by an input of the same block
pub struct Config {
    schemas: Arc<SchemaRegistry>,
    blocks: Option<AppBlocks>,
    connectors: Option<AppConnectors>,
    data_structures: Option<DataStructures>,
    battery_banks: Option<BatteryBanks>,
}

impl Config {
    pub fn new(schemas: Arc<SchemaRegistry>) -> Self {
        Self {
            schemas,
            blocks: None,
            connectors: None,
            data_structures: None,
            battery_banks: None,
        }
    }

    /// Locate, load and validate a configuration through `loader`.
    pub fn load(loader: &ConfigLoader, names: &[&str], schemas: Arc<SchemaRegistry>) -> VeMonitorResult<Self> {
        let document = loader.load(names)?;
        Self::from_document(schemas, document.value)
    }

    /// Build from a merged mapping-root document.
    ///
    /// `appBlocks`, `appConnectors` and `data_structure` are required;
    /// `batteryBanks` is optional.
    pub fn from_document(schemas: Arc<SchemaRegistry>, document: Value) -> VeMonitorResult<Self> {
        let Value::Mapping(mut root) = document else {
            return Err(SettingInvalid::new("root", "expected a mapping").into());
        };
        let mut take = |key: &str| {
            root.remove(key)
                .ok_or_else(|| SettingInvalid::new(key, "section is missing"))
        };

        let blocks = take(keys::APP_BLOCKS)?;
        let connectors = take(keys::APP_CONNECTORS)?;
        let data_structures = take(keys::DATA_STRUCTURE)?;
        let battery_banks = take(keys::BATTERY_BANKS).ok();

        let mut config = Self::new(schemas);
        config.set_app_blocks(blocks)?;
        config.set_app_connectors(connectors)?;
        config.set_data_structures(data_structures)?;
        if let Some(battery_banks) = battery_banks {
            config.set_battery_banks(battery_banks)?;
        }
        Ok(config)
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.schemas
    }

    pub fn blocks(&self) -> Option<&AppBlocks> {
        self.blocks.as_ref()
    }

    pub fn connectors(&self) -> Option<&AppConnectors> {
        self.connectors.as_ref()
    }

    pub fn data_structures(&self) -> Option<&DataStructures> {
        self.data_structures.as_ref()
    }

    pub fn battery_banks(&self) -> Option<&BatteryBanks> {
        self.battery_banks.as_ref()
    }

    /// Validate and install the `appBlocks` section. `Ok(false)` for a null section.
    pub fn set_app_blocks(&mut self, value: Value) -> VeMonitorResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        let value = self.schemas.validate(keys::APP_BLOCKS, value)?;
        let blocks: AppBlocks =
            serde_yaml::from_value(value).map_err(|e| SettingInvalid::new(keys::APP_BLOCKS, e.to_string()))?;
        blocks.check()?;

        let previous = self.blocks.replace(blocks);
        self.cross_check().inspect_err(|_| self.blocks = previous)?;
        Ok(true)
    }

    /// Validate and install the `appConnectors` section. `Ok(false)` for a null section.
    pub fn set_app_connectors(&mut self, value: Value) -> VeMonitorResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        let value = self.schemas.validate(keys::APP_CONNECTORS, value)?;
        let previous = self.connectors.replace(AppConnectors::from_value(&value)?);
        self.cross_check().inspect_err(|_| self.connectors = previous)?;
        Ok(true)
    }

    /// Validate and install the `data_structure` section.
    ///
    /// Fails with `MissingPointError` when a block column has no point.
    pub fn set_data_structures(&mut self, value: Value) -> VeMonitorResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        let value = self.schemas.validate(keys::DATA_STRUCTURE, value)?;
        let data_structures: DataStructures =
            serde_yaml::from_value(value).map_err(|e| SettingInvalid::new(keys::DATA_STRUCTURE, e.to_string()))?;

        let previous = self.data_structures.replace(data_structures);
        self.cross_check().inspect_err(|_| self.data_structures = previous)?;
        Ok(true)
    }

    /// Validate and install the `batteryBanks` section, checking each assembled bank on its own.
    pub fn set_battery_banks(&mut self, value: Value) -> VeMonitorResult<bool> {
        if value.is_null() {
            return Ok(false);
        }
        let value = self.schemas.validate(keys::BATTERY_BANKS, value)?;
        let section: BatteryBanksSection =
            serde_yaml::from_value(value).map_err(|e| SettingInvalid::new(keys::BATTERY_BANKS, e.to_string()))?;
        let banks = BatteryBanks::from_section(&section)?;

        for (name, bank) in banks.iter() {
            let bank_value = serde_yaml::to_value(bank)
                .map_err(|e| SettingInvalid::new(format!("{}.{name}", keys::BATTERY_BANKS), e.to_string()))?;
            self.schemas.validate(keys::BATTERY_BANK_ARGS, bank_value)?;
        }

        let previous = self.battery_banks.replace(banks);
        self.cross_check().inspect_err(|_| self.battery_banks = previous)?;
        Ok(true)
    }

    /// Restrict the active blocks to `names`, in their configured order.
    pub fn retain_blocks(&mut self, names: &[&str]) -> VeMonitorResult<bool> {
        let Some(blocks) = self.blocks.as_mut() else {
            return Ok(false);
        };
        if let Some(unknown) = names.iter().find(|n| blocks.by_name(n).is_none()) {
            return Err(SettingInvalid::new("blocks", format!("unknown block '{unknown}'")).into());
        }
        blocks.retain(names);
        Ok(true)
    }

    /// `{kind -> {instance}}` referenced by the active blocks.
    pub fn sources(&self) -> Sources {
        self.blocks.as_ref().map(AppBlocks::sources).unwrap_or_default()
    }

    /// The connector catalogue reduced to what the active blocks cite.
    pub fn active_connectors(&self) -> AppConnectors {
        let Some(connectors) = &self.connectors else {
            return AppConnectors::default();
        };
        let reduced = connectors.reduce(&self.sources());
        ConnectorsReduced {
            kept: reduced.len(),
            dropped: connectors.len() - reduced.len(),
        }
        .log();
        reduced
    }

    /// The bank named by the first active block's `args.batteryBanks`.
    pub fn battery_bank(&self) -> Option<&BatteryBankArgs> {
        let name = self.blocks.as_ref()?.first()?.args.battery_banks.as_deref()?;
        self.battery_banks.as_ref()?.get(name)
    }

    fn cross_check(&self) -> VeMonitorResult<()> {
        let Some(blocks) = &self.blocks else {
            return Ok(());
        };

        if let Some(connectors) = &self.connectors {
            check_sources_exist(blocks, connectors)?;
        }

        if let Some(data_structures) = &self.data_structures {
            data_structures.ensure_columns(blocks.columns())?;
        }

        if let Some(banks) = &self.battery_banks {
            for (i, block) in blocks.iter().enumerate() {
                if let Some(name) = &block.args.battery_banks {
                    if banks.get(name).is_none() {
                        return Err(ValidationError::new(
                            format!("{}[{i}].args.batteryBanks", keys::APP_BLOCKS),
                            "a bank declared in batteryBanks",
                            format!("string {name:?}"),
                        )
                        .into());
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_sources_exist(blocks: &AppBlocks, connectors: &AppConnectors) -> Result<(), ValidationError> {
    for (i, block) in blocks.iter().enumerate() {
        let sides = [("inputs", &block.inputs), ("outputs", &block.outputs)];
        for (side, wiring) in sides {
            for (kind, refs) in wiring {
                for (j, source_ref) in refs.iter().enumerate() {
                    if !connectors.has(*kind, &source_ref.source) {
                        return Err(ValidationError::new(
                            format!("{}[{i}].{side}.{kind}[{j}].source", keys::APP_BLOCKS),
                            format!("a {kind} connector declared in appConnectors"),
                            format!("string {:?}", source_ref.source),
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}
