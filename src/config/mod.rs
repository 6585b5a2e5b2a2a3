// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod battery_banks;
mod blocks;
mod connectors;
mod data_structures;
mod loader;
mod model;

pub mod consts;

pub use battery_banks::{BankAssembly, BatteryBankArgs, BatteryBanks, BatteryBanksSection, BatteryDatas, BatteryModel};
pub use blocks::{AppBlocks, Block, BlockArgs, Columns, ConnectorKind, RefCol, SourceRef, Sources, Wiring};
pub use connectors::{
    expand_home, AppConnectors, CacheStoreSettings, ConnectorSettings, HttpSettings, SerialSettings, HOME_TOKEN,
};
pub use data_structures::{DataStructures, Device, Point, PointType, PointValue};
pub use loader::{ConfigLoader, LoadedDocument};
pub use model::Config;
