// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::SettingInvalid;

/// A named battery model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryModel {
    /// Nominal voltage of one unit.
    pub voltage: f64,
    /// Capacity of one unit, in Ah.
    pub capacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// A bank built from `in_series x in_parallel` units of one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAssembly {
    pub battery: String,
    pub in_series: u32,
    pub in_parallel: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryDatas {
    #[serde(default)]
    pub batteries: IndexMap<String, BatteryModel>,
    #[serde(default)]
    pub banks: IndexMap<String, BankAssembly>,
}

/// Assembled view of one bank, as consumed by battery middleware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryBankArgs {
    pub name: String,
    pub battery: String,
    pub in_series: u32,
    pub in_parallel: u32,
    pub nominal_voltage: f64,
    pub capacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
}

impl BatteryBankArgs {
    pub fn assemble(name: &str, assembly: &BankAssembly, model: &BatteryModel) -> Self {
        Self {
            name: name.to_string(),
            battery: assembly.battery.clone(),
            in_series: assembly.in_series,
            in_parallel: assembly.in_parallel,
            nominal_voltage: model.voltage * f64::from(assembly.in_series),
            capacity: model.capacity * f64::from(assembly.in_parallel),
            material: model.material.clone(),
        }
    }
}

/// The `batteryBanks` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatteryBanksSection {
    #[serde(rename = "batteryDatas", default, skip_serializing_if = "Option::is_none")]
    pub battery_datas: Option<BatteryDatas>,
    /// Pre-assembled banks; these win over `batteryDatas` assemblies of the same name.
    #[serde(rename = "batteryBankArgs", default, skip_serializing_if = "IndexMap::is_empty")]
    pub battery_bank_args: IndexMap<String, BatteryBankArgs>,
}

/// Every assembled bank by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatteryBanks {
    banks: IndexMap<String, BatteryBankArgs>,
}

impl BatteryBanks {
    pub fn from_section(section: &BatteryBanksSection) -> Result<Self, SettingInvalid> {
        let mut banks = IndexMap::new();
        if let Some(datas) = &section.battery_datas {
            for (name, assembly) in &datas.banks {
                let model = datas.batteries.get(&assembly.battery).ok_or_else(|| {
                    SettingInvalid::new(
                        format!("batteryBanks.batteryDatas.banks.{name}.battery"),
                        format!("unknown battery model '{}'", assembly.battery),
                    )
                })?;
                banks.insert(name.clone(), BatteryBankArgs::assemble(name, assembly, model));
            }
        }
        for (name, args) in &section.battery_bank_args {
            banks.insert(name.clone(), args.clone());
        }
        Ok(Self { banks })
    }

    pub fn get(&self, name: &str) -> Option<&BatteryBankArgs> {
        self.banks.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BatteryBankArgs)> {
        self.banks.iter().map(|(name, bank)| (name.as_str(), bank))
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(yaml: &str) -> BatteryBanksSection {
        serde_yaml::from_str(yaml).unwrap()
    }

    const DATAS: &str = r#"
batteryDatas:
  batteries:
    gel100: { voltage: 12, capacity: 100, material: gel }
  banks:
    bankA: { battery: gel100, in_series: 2, in_parallel: 3 }
"#;

    #[test]
    fn test_assembles_bank_from_model() {
        let banks = BatteryBanks::from_section(&section(DATAS)).unwrap();
        let bank = banks.get("bankA").unwrap();
        assert_eq!(bank.nominal_voltage, 24.0);
        assert_eq!(bank.capacity, 300.0);
        assert_eq!(bank.material.as_deref(), Some("gel"));
    }

    #[test]
    fn test_unknown_model_is_setting_invalid() {
        let broken = DATAS.replace("battery: gel100", "battery: lifepo");
        let err = BatteryBanks::from_section(&section(&broken)).unwrap_err();
        assert_eq!(err.field, "batteryBanks.batteryDatas.banks.bankA.battery");
    }

    #[test]
    fn test_explicit_args_override_assembly() {
        let yaml = format!(
            "{DATAS}batteryBankArgs:\n  bankA: {{ name: bankA, battery: gel100, in_series: 4, in_parallel: 1, nominal_voltage: 48, capacity: 100 }}\n"
        );
        let banks = BatteryBanks::from_section(&section(&yaml)).unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks.get("bankA").unwrap().nominal_voltage, 48.0);
    }
}
