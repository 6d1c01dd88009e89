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

use super::{EntityValue, Platform, WallboxEntity};
use crate::coordinator::WallboxCoordinator;
use crate::errors::{CoordinatorError, CoordinatorResult};
use crate::snapshot::{ChargerStatus, keys, value_as_f64};
use anyhow::bail;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Largest number of decimals a sensor may round to
pub const MAX_PRECISION: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorDeviceClass {
    Power,
    Current,
    Energy,
    Battery,
    Duration,
}

impl SensorDeviceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Current => "current",
            Self::Energy => "energy",
            Self::Battery => "battery",
            Self::Duration => "duration",
        }
    }
}

/// Static metadata of one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub precision: Option<u8>,
    pub device_class: Option<SensorDeviceClass>,
}

impl SensorDescription {
    const fn new(key: &'static str, name: &'static str) -> Self {
        Self {
            key,
            name,
            unit: None,
            icon: None,
            precision: None,
            device_class: None,
        }
    }

    const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = Some(unit);
        self
    }

    const fn icon(mut self, icon: &'static str) -> Self {
        self.icon = Some(icon);
        self
    }

    const fn precision(mut self, precision: u8) -> Self {
        self.precision = Some(precision);
        self
    }

    const fn device_class(mut self, device_class: SensorDeviceClass) -> Self {
        self.device_class = Some(device_class);
        self
    }

    /// Typed value of this sensor in a snapshot, rounded to its precision
    pub fn render(&self, status: &ChargerStatus) -> CoordinatorResult<EntityValue> {
        match status.get(self.key)? {
            Value::Bool(b) => Ok(EntityValue::Bool(*b)),
            value @ Value::String(s) => match value_as_f64(value) {
                // the cloud sends some measurements as strings
                Some(number) if self.is_measurement() => {
                    Ok(EntityValue::Number(self.round(number)))
                }
                _ => Ok(EntityValue::Text(s.clone())),
            },
            value @ Value::Number(_) => {
                let number = value_as_f64(value).ok_or_else(|| CoordinatorError::InvalidField {
                    key: self.key.to_string(),
                    value: value.to_string(),
                })?;
                Ok(EntityValue::Number(self.round(number)))
            }
            other => Err(CoordinatorError::InvalidField {
                key: self.key.to_string(),
                value: other.to_string(),
            }),
        }
    }

    /// Sensors with a unit or a precision always report numbers
    pub fn is_measurement(&self) -> bool {
        self.unit.is_some() || self.precision.is_some()
    }

    pub fn round(&self, value: f64) -> f64 {
        match self.precision {
            Some(precision) => {
                let factor = 10f64.powi(i32::from(precision));
                (value * factor).round() / factor
            }
            None => value,
        }
    }
}

/// Every sensor the integration knows about
pub const SENSOR_TYPES: &[SensorDescription] = &[
    SensorDescription::new(keys::CHARGING_POWER, "Charging Power")
        .unit("kW")
        .precision(2)
        .device_class(SensorDeviceClass::Power),
    SensorDescription::new(keys::MAX_AVAILABLE_POWER, "Max Available Power")
        .unit("A")
        .precision(0)
        .device_class(SensorDeviceClass::Current),
    SensorDescription::new(keys::CHARGING_SPEED, "Charging Speed")
        .icon("mdi:speedometer")
        .precision(0),
    SensorDescription::new(keys::ADDED_RANGE, "Added Range")
        .unit("km")
        .icon("mdi:map-marker-distance")
        .precision(0),
    SensorDescription::new(keys::ADDED_ENERGY, "Added Energy")
        .unit("kWh")
        .precision(2)
        .device_class(SensorDeviceClass::Energy),
    SensorDescription::new(keys::CHARGING_TIME, "Charging Time")
        .unit("s")
        .device_class(SensorDeviceClass::Duration),
    SensorDescription::new(keys::CHARGING_CURRENT, "Charging Current")
        .unit("A")
        .device_class(SensorDeviceClass::Current),
    SensorDescription::new(keys::COST, "Cost").icon("mdi:ev-station"),
    SensorDescription::new(keys::STATE_OF_CHARGE, "State of Charge")
        .unit("%")
        .device_class(SensorDeviceClass::Battery),
    SensorDescription::new(keys::CURRENT_MODE, "Current Mode").icon("mdi:ev-station"),
    SensorDescription::new(keys::DEPOT_PRICE, "Depot Price")
        .icon("mdi:ev-station")
        .precision(2),
    SensorDescription::new(keys::STATUS_DESCRIPTION, "Status Description").icon("mdi:ev-station"),
    SensorDescription::new(keys::MAX_CHARGING_CURRENT, "Max. Charging Current")
        .unit("A")
        .device_class(SensorDeviceClass::Current),
];

/// Session fields reported as attributes of the status description sensor
pub const STATUS_ATTRIBUTES: &[&str] = &[
    keys::USER_ID,
    keys::USER_NAME,
    keys::CAR_ID,
    keys::CAR_PLATE,
    keys::LAST_SYNC,
];

/// Reject tables with duplicate keys, empty names or unreasonable precision
pub fn validate_descriptions(descriptions: &[SensorDescription]) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for description in descriptions {
        if description.key.is_empty() || description.name.trim().is_empty() {
            bail!("Sensor '{}' needs both a key and a name", description.key);
        }
        if !seen.insert(description.key) {
            bail!("Duplicate sensor key '{}'", description.key);
        }
        if description.precision.is_some_and(|p| p > MAX_PRECISION) {
            bail!(
                "Sensor '{}' precision must be at most {}",
                description.key,
                MAX_PRECISION
            );
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct WallboxSensor {
    coordinator: Arc<WallboxCoordinator>,
    description: &'static SensorDescription,
}

impl WallboxSensor {
    pub fn new(
        coordinator: Arc<WallboxCoordinator>,
        description: &'static SensorDescription,
    ) -> Self {
        Self {
            coordinator,
            description,
        }
    }

    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }
}

impl WallboxEntity for WallboxSensor {
    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn key(&self) -> &'static str {
        self.description.key
    }

    fn name(&self) -> &str {
        self.description.name
    }

    fn coordinator(&self) -> &Arc<WallboxCoordinator> {
        &self.coordinator
    }

    fn read(&self, status: &ChargerStatus) -> CoordinatorResult<EntityValue> {
        self.description.render(status)
    }

    fn icon(&self, _status: Option<&ChargerStatus>) -> Option<&'static str> {
        self.description.icon
    }

    fn unit(&self) -> Option<&'static str> {
        self.description.unit
    }

    fn device_class(&self) -> Option<&'static str> {
        self.description.device_class.map(SensorDeviceClass::as_str)
    }

    fn precision(&self) -> Option<u8> {
        self.description.precision
    }

    fn attributes(&self, status: &ChargerStatus) -> Map<String, Value> {
        if self.description.key != keys::STATUS_DESCRIPTION {
            return Map::new();
        }
        STATUS_ATTRIBUTES
            .iter()
            .filter_map(|key| {
                let value = status.get(key).ok()?;
                Some(((*key).to_string(), value.clone()))
            })
            .collect()
    }
}
