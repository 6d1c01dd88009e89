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
use crate::errors::CoordinatorResult;
use crate::snapshot::{ChargerStatus, keys};
use std::sync::Arc;

pub const LOCKED_ICON: &str = "mdi:lock";
pub const UNLOCKED_ICON: &str = "mdi:lock-open";

/// Locks the charger against unauthorized sessions
#[derive(Debug)]
pub struct WallboxLock {
    coordinator: Arc<WallboxCoordinator>,
}

impl WallboxLock {
    pub fn new(coordinator: Arc<WallboxCoordinator>) -> Self {
        Self { coordinator }
    }

    /// None while there is no snapshot or it lacks the lock flag
    pub fn is_locked(&self) -> Option<bool> {
        self.coordinator
            .data()
            .and_then(|status| status.boolean(keys::LOCKED_UNLOCKED).ok())
    }

    pub async fn lock(&self) -> CoordinatorResult<()> {
        self.coordinator.set_lock(true).await
    }

    pub async fn unlock(&self) -> CoordinatorResult<()> {
        self.coordinator.set_lock(false).await
    }
}

impl WallboxEntity for WallboxLock {
    fn platform(&self) -> Platform {
        Platform::Lock
    }

    fn key(&self) -> &'static str {
        keys::LOCKED_UNLOCKED
    }

    fn name(&self) -> &str {
        "Lock"
    }

    fn coordinator(&self) -> &Arc<WallboxCoordinator> {
        &self.coordinator
    }

    fn read(&self, status: &ChargerStatus) -> CoordinatorResult<EntityValue> {
        status.boolean(keys::LOCKED_UNLOCKED).map(EntityValue::Bool)
    }

    fn icon(&self, status: Option<&ChargerStatus>) -> Option<&'static str> {
        let locked = status.is_some_and(|s| s.boolean(keys::LOCKED_UNLOCKED).unwrap_or(false));
        Some(if locked { LOCKED_ICON } else { UNLOCKED_ICON })
    }
}
