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
use crate::snapshot::{ChargerStatus, keys};
use std::sync::Arc;
use tracing::warn;

pub const MIN_CHARGING_CURRENT: f64 = 6.0;
/// Upper bound used until the charger reports its own
pub const DEFAULT_MAX_CHARGING_CURRENT: f64 = 32.0;
pub const CHARGING_CURRENT_STEP: f64 = 1.0;

/// Maximum charging current setpoint
#[derive(Debug)]
pub struct WallboxNumber {
    coordinator: Arc<WallboxCoordinator>,
}

impl WallboxNumber {
    pub fn new(coordinator: Arc<WallboxCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn min_value(&self) -> f64 {
        MIN_CHARGING_CURRENT
    }

    /// Bounded by what the installation can deliver
    pub fn max_value(&self) -> f64 {
        self.coordinator
            .data()
            .and_then(|status| status.number(keys::MAX_AVAILABLE_POWER).ok())
            .filter(|max| *max >= MIN_CHARGING_CURRENT)
            .unwrap_or(DEFAULT_MAX_CHARGING_CURRENT)
    }

    pub fn step(&self) -> f64 {
        CHARGING_CURRENT_STEP
    }

    pub async fn set_value(&self, value: f64) -> CoordinatorResult<()> {
        let (min, max) = (self.min_value(), self.max_value());
        if !value.is_finite() || value < min || value > max {
            warn!("Rejected charging current {} A, allowed {}-{} A", value, min, max);
            return Err(CoordinatorError::InvalidValue(format!(
                "{value} A is outside the allowed range {min}-{max} A"
            )));
        }
        self.coordinator.set_max_charging_current(value).await
    }
}

impl WallboxEntity for WallboxNumber {
    fn platform(&self) -> Platform {
        Platform::Number
    }

    fn key(&self) -> &'static str {
        keys::MAX_CHARGING_CURRENT
    }

    fn name(&self) -> &str {
        "Max. Charging Current"
    }

    fn coordinator(&self) -> &Arc<WallboxCoordinator> {
        &self.coordinator
    }

    fn read(&self, status: &ChargerStatus) -> CoordinatorResult<EntityValue> {
        status.number(keys::MAX_CHARGING_CURRENT).map(EntityValue::Number)
    }

    fn unit(&self) -> Option<&'static str> {
        Some("A")
    }

    fn device_class(&self) -> Option<&'static str> {
        Some("current")
    }
}
