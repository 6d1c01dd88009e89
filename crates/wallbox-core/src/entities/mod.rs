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

//! Entity adapters: each one maps a field of the coordinator snapshot to a typed value,
//! and the command-capable ones forward user actions to the coordinator.

pub mod device;
pub mod lock;
pub mod number;
pub mod sensor;
pub mod switch;

pub use device::DeviceInfo;
pub use lock::WallboxLock;
pub use number::WallboxNumber;
pub use sensor::{SENSOR_TYPES, SensorDescription, SensorDeviceClass, WallboxSensor};
pub use switch::WallboxPauseSwitch;

use crate::coordinator::WallboxCoordinator;
use crate::errors::CoordinatorResult;
use crate::snapshot::ChargerStatus;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Host platform an entity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Sensor,
    Lock,
    Number,
    Switch,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Lock => "lock",
            Self::Number => "number",
            Self::Switch => "switch",
        }
    }

    pub fn all() -> &'static [Platform] {
        &[Self::Sensor, Self::Number, Self::Lock, Self::Switch]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityState {
    Available(EntityValue),
    Unavailable,
}

impl EntityState {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn value(&self) -> Option<&EntityValue> {
        match self {
            Self::Available(value) => Some(value),
            Self::Unavailable => None,
        }
    }
}

/// Common surface of every Wallbox entity
pub trait WallboxEntity: Send + Sync {
    fn platform(&self) -> Platform;

    /// Snapshot field the entity is built on
    fn key(&self) -> &'static str;

    fn name(&self) -> &str;

    fn coordinator(&self) -> &Arc<WallboxCoordinator>;

    /// Read the typed value out of a snapshot
    fn read(&self, status: &ChargerStatus) -> CoordinatorResult<EntityValue>;

    fn icon(&self, _status: Option<&ChargerStatus>) -> Option<&'static str> {
        None
    }

    fn unit(&self) -> Option<&'static str> {
        None
    }

    fn device_class(&self) -> Option<&'static str> {
        None
    }

    fn precision(&self) -> Option<u8> {
        None
    }

    /// Extra state attributes published next to the value
    fn attributes(&self, _status: &ChargerStatus) -> Map<String, Value> {
        Map::new()
    }

    /// Missing or malformed fields render as unavailable instead of failing
    fn state_from(&self, status: &ChargerStatus) -> EntityState {
        match self.read(status) {
            Ok(value) => EntityState::Available(value),
            Err(e) => {
                debug!("{}.{} unavailable: {}", self.platform(), self.key(), e);
                EntityState::Unavailable
            }
        }
    }

    /// Current state; unavailable until the first refresh and after a failed one
    fn state(&self) -> EntityState {
        let state = self.coordinator().state();
        match state.data {
            Some(status) if state.last_update_success => self.state_from(&status),
            _ => EntityState::Unavailable,
        }
    }

    fn unique_id(&self, status: &ChargerStatus) -> Option<String> {
        DeviceInfo::serial_number(status).map(|serial| format!("{}-{}", self.key(), serial))
    }
}

/// Every entity registered for one charger
pub struct WallboxEntities {
    pub sensors: Vec<WallboxSensor>,
    pub number: WallboxNumber,
    pub lock: WallboxLock,
    pub switch: WallboxPauseSwitch,
}

impl fmt::Debug for WallboxEntities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WallboxEntities")
            .field(
                "sensors",
                &self.sensors.iter().map(WallboxEntity::key).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl WallboxEntities {
    /// Validate the sensor table and build the entities. When a snapshot is already
    /// available, only sensors whose field it reports are registered
    pub fn new(coordinator: &Arc<WallboxCoordinator>) -> anyhow::Result<Self> {
        sensor::validate_descriptions(SENSOR_TYPES)?;

        let data = coordinator.data();
        let sensors: Vec<WallboxSensor> = SENSOR_TYPES
            .iter()
            .filter(|description| data.as_ref().is_none_or(|status| status.contains(description.key)))
            .map(|description| WallboxSensor::new(Arc::clone(coordinator), description))
            .collect();

        info!(
            "📦 Registered {} Wallbox sensors for station {}",
            sensors.len(),
            coordinator.station()
        );

        Ok(Self {
            sensors,
            number: WallboxNumber::new(Arc::clone(coordinator)),
            lock: WallboxLock::new(Arc::clone(coordinator)),
            switch: WallboxPauseSwitch::new(Arc::clone(coordinator)),
        })
    }

    pub fn all(&self) -> Vec<&dyn WallboxEntity> {
        let mut entities: Vec<&dyn WallboxEntity> = self
            .sensors
            .iter()
            .map(|sensor| sensor as &dyn WallboxEntity)
            .collect();
        entities.push(&self.number);
        entities.push(&self.lock);
        entities.push(&self.switch);
        entities
    }
}
