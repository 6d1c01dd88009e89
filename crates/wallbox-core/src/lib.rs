// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Wallbox Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

pub mod config;
pub mod coordinator;
pub mod entities;
pub mod errors;
pub mod snapshot;
pub mod status;
pub mod traits;

pub use config::{ApiSettings, WallboxConfig};
pub use coordinator::{
    ChargerCommand, CoordinatorState, PollingHandle, SessionState, UPDATE_INTERVAL,
    WallboxCoordinator,
};
pub use entities::{
    DeviceInfo, EntityState, EntityValue, Platform, WallboxEntities, WallboxEntity,
};
pub use errors::{CoordinatorError, CoordinatorResult};
pub use snapshot::ChargerStatus;
pub use status::{CHARGER_STATUS, UNKNOWN_STATUS, status_description};
pub use traits::ChargerApi;

/// Integration domain, used for device identifiers and entity ids
pub const DOMAIN: &str = "wallbox";
