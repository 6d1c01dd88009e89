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

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wallbox_api::{DEFAULT_BASE_URL, WallboxClient};

/// One configured charger: credentials plus the station it controls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallboxConfig {
    pub username: String,
    /// Never written back out when the config is serialized
    #[serde(default, skip_serializing)]
    pub password: String,
    pub station: String,
    /// Friendly name used when the portal does not report one
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,
}

/// HTTP behaviour of the Wallbox API client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_name() -> String {
    "Wallbox".to_owned()
}

fn default_update_interval_secs() -> u64 {
    30
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for WallboxConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            station: String::new(),
            name: default_name(),
            update_interval_secs: default_update_interval_secs(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl WallboxConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            bail!("wallbox.username cannot be empty");
        }
        if self.password.is_empty() {
            bail!("wallbox.password cannot be empty (set it in the config or WALLBOX_PASSWORD)");
        }
        if self.station.trim().is_empty() {
            bail!("wallbox.station cannot be empty");
        }
        if self.update_interval_secs == 0 {
            bail!("wallbox.update_interval_secs must be greater than zero");
        }
        Ok(())
    }

    /// Build an API client for these credentials
    pub fn build_client(&self, api: &ApiSettings) -> Result<WallboxClient> {
        let client = WallboxClient::with_timeout(
            self.username.clone(),
            self.password.clone(),
            Duration::from_secs(api.timeout_secs),
        )?
        .with_base_url(api.base_url.clone())
        .with_retry_config(api.max_retries, Duration::from_millis(api.retry_delay_ms));
        Ok(client)
    }
}

impl ApiSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            bail!("api.base_url must start with http:// or https://, got '{}'", self.base_url);
        }
        if self.timeout_secs == 0 {
            bail!("api.timeout_secs must be greater than zero");
        }
        if self.max_retries == 0 {
            bail!("api.max_retries must be at least 1");
        }
        Ok(())
    }
}
