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

use crate::DOMAIN;
use crate::errors::CoordinatorResult;
use crate::snapshot::{ChargerStatus, keys};
use serde::Serialize;
use serde_json::Value;

/// Device registry metadata shared by all entities of one charger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
}

impl DeviceInfo {
    pub fn from_status(status: &ChargerStatus) -> CoordinatorResult<Self> {
        let serial = value_to_string(status.nested(&[keys::CONFIG_DATA, keys::SERIAL_NUMBER])?);
        let name = value_to_string(status.get(keys::NAME)?);
        let model = value_to_string(status.nested(&[keys::CONFIG_DATA, keys::PART_NUMBER])?);
        let sw_version = value_to_string(status.nested(&[
            keys::CONFIG_DATA,
            keys::SOFTWARE,
            keys::CURRENT_VERSION,
        ])?);

        Ok(Self {
            identifiers: vec![(DOMAIN.to_owned(), serial)],
            name: format!("Wallbox - {name}"),
            manufacturer: "Wallbox".to_owned(),
            model,
            sw_version,
        })
    }

    pub fn serial_number(status: &ChargerStatus) -> Option<String> {
        status
            .nested(&[keys::CONFIG_DATA, keys::SERIAL_NUMBER])
            .ok()
            .map(value_to_string)
    }
}

// Serial numbers come back as numbers on some firmware
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
