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

use async_trait::async_trait;
use serde_json::{Map, Value};
use wallbox_api::{WallboxClient, WallboxResult};

/// Remote operations the coordinator needs from the Wallbox cloud
#[async_trait]
pub trait ChargerApi: Send + Sync {
    /// Establish a new session, replacing any existing one
    async fn authenticate(&self) -> WallboxResult<()>;

    /// Whether a usable session is currently held
    fn is_authenticated(&self) -> bool;

    async fn get_charger_status(&self, station: &str) -> WallboxResult<Map<String, Value>>;

    async fn set_max_charging_current(&self, station: &str, amps: f64) -> WallboxResult<()>;

    async fn lock_charger(&self, station: &str) -> WallboxResult<()>;

    async fn unlock_charger(&self, station: &str) -> WallboxResult<()>;

    async fn pause_charging_session(&self, station: &str) -> WallboxResult<()>;

    async fn resume_charging_session(&self, station: &str) -> WallboxResult<()>;

    /// Source name for logging
    fn name(&self) -> &'static str {
        "wallbox"
    }
}

#[async_trait]
impl ChargerApi for WallboxClient {
    async fn authenticate(&self) -> WallboxResult<()> {
        WallboxClient::authenticate(self).await
    }

    fn is_authenticated(&self) -> bool {
        WallboxClient::is_authenticated(self)
    }

    async fn get_charger_status(&self, station: &str) -> WallboxResult<Map<String, Value>> {
        WallboxClient::get_charger_status(self, station).await
    }

    async fn set_max_charging_current(&self, station: &str, amps: f64) -> WallboxResult<()> {
        WallboxClient::set_max_charging_current(self, station, amps).await
    }

    async fn lock_charger(&self, station: &str) -> WallboxResult<()> {
        WallboxClient::lock_charger(self, station).await
    }

    async fn unlock_charger(&self, station: &str) -> WallboxResult<()> {
        WallboxClient::unlock_charger(self, station).await
    }

    async fn pause_charging_session(&self, station: &str) -> WallboxResult<()> {
        WallboxClient::pause_charging_session(self, station).await
    }

    async fn resume_charging_session(&self, station: &str) -> WallboxResult<()> {
        WallboxClient::resume_charging_session(self, station).await
    }

    fn name(&self) -> &'static str {
        "wallbox-cloud"
    }
}
