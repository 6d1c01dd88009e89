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

pub const PAUSE_RESUME_KEY: &str = "pause_resume";
pub const PAUSED_STATUS: &str = "Paused";
// Shows the action that undoes the current state
pub const PAUSED_ICON: &str = "mdi:motion-play-outline";
pub const ACTIVE_ICON: &str = "mdi:motion-pause-outline";

/// On while the charging session is paused
#[derive(Debug)]
pub struct WallboxPauseSwitch {
    coordinator: Arc<WallboxCoordinator>,
}

impl WallboxPauseSwitch {
    pub fn new(coordinator: Arc<WallboxCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn is_paused(status: &ChargerStatus) -> bool {
        status.status_description() == PAUSED_STATUS
    }

    /// Pause the charging session
    pub async fn turn_on(&self) -> CoordinatorResult<()> {
        self.coordinator.pause_resume(true).await
    }

    /// Resume the charging session
    pub async fn turn_off(&self) -> CoordinatorResult<()> {
        self.coordinator.pause_resume(false).await
    }
}

impl WallboxEntity for WallboxPauseSwitch {
    fn platform(&self) -> Platform {
        Platform::Switch
    }

    fn key(&self) -> &'static str {
        PAUSE_RESUME_KEY
    }

    fn name(&self) -> &str {
        "Pause"
    }

    fn coordinator(&self) -> &Arc<WallboxCoordinator> {
        &self.coordinator
    }

    fn read(&self, status: &ChargerStatus) -> CoordinatorResult<EntityValue> {
        status
            .text(keys::STATUS_DESCRIPTION)
            .map(|description| EntityValue::Bool(description == PAUSED_STATUS))
    }

    fn icon(&self, status: Option<&ChargerStatus>) -> Option<&'static str> {
        let paused = status.is_some_and(Self::is_paused);
        Some(if paused { PAUSED_ICON } else { ACTIVE_ICON })
    }
}
