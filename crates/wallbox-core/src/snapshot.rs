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

use crate::errors::{CoordinatorError, CoordinatorResult};
use crate::status::status_description;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Field names of the charger status document
pub mod keys {
    pub const CONFIG_DATA: &str = "config_data";
    pub const STATUS_ID: &str = "status_id";
    pub const STATUS_DESCRIPTION: &str = "status_description";
    pub const MAX_CHARGING_CURRENT: &str = "max_charging_current";
    pub const LOCKED_UNLOCKED: &str = "locked_unlocked";
    /// Lock flag as reported inside `config_data`
    pub const LOCKED: &str = "locked";
    pub const MAX_AVAILABLE_POWER: &str = "max_available_power";
    pub const CHARGING_POWER: &str = "charging_power";
    pub const CHARGING_SPEED: &str = "charging_speed";
    pub const CHARGING_CURRENT: &str = "charging_current";
    pub const ADDED_RANGE: &str = "added_range";
    pub const ADDED_ENERGY: &str = "added_energy";
    pub const CHARGING_TIME: &str = "charging_time";
    pub const COST: &str = "cost";
    pub const STATE_OF_CHARGE: &str = "state_of_charge";
    pub const CURRENT_MODE: &str = "current_mode";
    pub const DEPOT_PRICE: &str = "depot_price";
    pub const NAME: &str = "name";
    pub const SERIAL_NUMBER: &str = "serial_number";
    pub const PART_NUMBER: &str = "part_number";
    pub const SOFTWARE: &str = "software";
    pub const CURRENT_VERSION: &str = "currentVersion";
    pub const USER_ID: &str = "user_id";
    pub const USER_NAME: &str = "user_name";
    pub const CAR_ID: &str = "car_id";
    pub const CAR_PLATE: &str = "car_plate";
    pub const LAST_SYNC: &str = "last_sync";
}

/// One poll's worth of charger status, with derived fields flattened to the top level
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChargerStatus {
    fields: Map<String, Value>,
}

impl ChargerStatus {
    /// Build a snapshot from the raw API document, adding the derived fields
    pub fn from_raw(mut fields: Map<String, Value>) -> Self {
        let config_data = fields
            .get(keys::CONFIG_DATA)
            .and_then(Value::as_object)
            .cloned();

        match config_data {
            Some(config) => {
                if let Some(current) = config.get(keys::MAX_CHARGING_CURRENT) {
                    fields.insert(keys::MAX_CHARGING_CURRENT.to_string(), current.clone());
                }
                let locked = config
                    .get(keys::LOCKED)
                    .or_else(|| config.get(keys::LOCKED_UNLOCKED));
                if let Some(locked) = locked {
                    fields.insert(keys::LOCKED_UNLOCKED.to_string(), locked.clone());
                }
            }
            None => debug!("Charger status has no config_data, derived fields left out"),
        }

        let description = fields
            .get(keys::STATUS_ID)
            .and_then(Value::as_i64)
            .map_or(crate::status::UNKNOWN_STATUS, status_description);
        fields.insert(
            keys::STATUS_DESCRIPTION.to_string(),
            Value::String(description.to_string()),
        );

        Self { fields }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Raw value of a top-level field
    pub fn get(&self, key: &str) -> CoordinatorResult<&Value> {
        match self.fields.get(key) {
            Some(Value::Null) | None => Err(CoordinatorError::UnknownField(key.to_string())),
            Some(value) => Ok(value),
        }
    }

    /// Value at a path of nested objects, e.g. `["config_data", "software", "currentVersion"]`
    pub fn nested(&self, path: &[&str]) -> CoordinatorResult<&Value> {
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| CoordinatorError::UnknownField(String::new()))?;

        let mut value = self.get(first)?;
        for key in rest {
            value = value
                .get(*key)
                .filter(|v| !v.is_null())
                .ok_or_else(|| CoordinatorError::UnknownField(path.join(".")))?;
        }
        Ok(value)
    }

    /// Numeric field; numeric strings are accepted as the portal is not consistent about them
    pub fn number(&self, key: &str) -> CoordinatorResult<f64> {
        let value = self.get(key)?;
        value_as_f64(value).ok_or_else(|| CoordinatorError::InvalidField {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// Boolean field; the portal reports flags as 0/1
    pub fn boolean(&self, key: &str) -> CoordinatorResult<bool> {
        let value = self.get(key)?;
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).ok_or_else(|| {
                CoordinatorError::InvalidField {
                    key: key.to_string(),
                    value: value.to_string(),
                }
            }),
            other => Err(CoordinatorError::InvalidField {
                key: key.to_string(),
                value: other.to_string(),
            }),
        }
    }

    pub fn text(&self, key: &str) -> CoordinatorResult<&str> {
        let value = self.get(key)?;
        value.as_str().ok_or_else(|| CoordinatorError::InvalidField {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn status_description(&self) -> &str {
        self.text(keys::STATUS_DESCRIPTION)
            .unwrap_or(crate::status::UNKNOWN_STATUS)
    }
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
