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

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::{info, warn};
use wallbox_core::{ApiSettings, DOMAIN, WallboxConfig};

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub wallbox: WallboxConfig,
    #[serde(default)]
    pub home_assistant: HomeAssistantConfig,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeAssistantConfig {
    /// Publish entities to Home Assistant while running
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    /// Entity ids become `{platform}.{entity_prefix}_{key}`
    #[serde(default = "default_entity_prefix")]
    pub entity_prefix: String,
}

/// Local endpoint through which a running bridge accepts charger commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Socket address to listen on; keep it on loopback unless the network is trusted
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "127.0.0.1:8765".to_owned()
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            listen: default_listen(),
        }
    }
}

impl ControlConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().with_context(|| {
            format!(
                "control.listen must be an address like 127.0.0.1:8765, got '{}'",
                self.listen
            )
        })
    }
}

fn default_enabled() -> bool {
    true
}

fn default_entity_prefix() -> String {
    DOMAIN.to_owned()
}

impl Default for HomeAssistantConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: None,
            token: None,
            entity_prefix: default_entity_prefix(),
        }
    }
}

impl AppConfig {
    /// Load the TOML file at `path` (defaults when it is missing), apply
    /// environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config = Self::parse(&config_str)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            info!("✅ Loaded configuration from {}", path.display());
            config
        } else {
            warn!(
                "No configuration file at {}, using defaults with environment overrides",
                path.display()
            );
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    /// Apply `WALLBOX_*` and `HA_*` overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup("WALLBOX_USERNAME") {
            self.wallbox.username = username;
        }
        if let Some(password) = lookup("WALLBOX_PASSWORD") {
            self.wallbox.password = password;
        }
        if let Some(station) = lookup("WALLBOX_STATION") {
            self.wallbox.station = station;
        }
        if let Some(interval) = lookup("WALLBOX_UPDATE_INTERVAL_SECS") {
            match interval.parse::<u64>() {
                Ok(secs) => self.wallbox.update_interval_secs = secs,
                Err(_) => warn!("Ignoring invalid WALLBOX_UPDATE_INTERVAL_SECS '{}'", interval),
            }
        }
        if let Some(url) = lookup("HA_BASE_URL") {
            self.home_assistant.base_url = Some(url);
        }
        if let Some(token) = lookup("HA_TOKEN") {
            self.home_assistant.token = Some(token);
        }
        if let Some(listen) = lookup("WALLBOX_CONTROL_LISTEN") {
            self.control.listen = listen;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.wallbox.validate()?;
        self.api.validate()?;

        let prefix = &self.home_assistant.entity_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            bail!(
                "home_assistant.entity_prefix must be lowercase letters, digits or '_', got '{}'",
                prefix
            );
        }

        if self.control.enabled {
            self.control.socket_addr()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[wallbox]
username = "user@example.com"
password = "secret"
station = "12345"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::parse(MINIMAL).unwrap();

        assert_eq!(config.wallbox.station, "12345");
        assert_eq!(config.wallbox.name, "Wallbox");
        assert_eq!(config.wallbox.update_interval_secs, 30);
        assert!(config.home_assistant.enabled);
        assert_eq!(config.home_assistant.entity_prefix, "wallbox");
        assert_eq!(config.api.max_retries, 3);
        assert!(config.control.enabled);
        assert_eq!(config.control.listen, "127.0.0.1:8765");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[wallbox]
username = "user@example.com"
password = "secret"
station = "12345"
update_interval_secs = 60

[home_assistant]
enabled = false
entity_prefix = "garage"

[api]
base_url = "http://localhost:9000"
max_retries = 1
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.wallbox.update_interval_secs, 60);
        assert!(!config.home_assistant.enabled);
        assert_eq!(config.home_assistant.entity_prefix, "garage");
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.api.max_retries, 1);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[wallbox\nusername = ").unwrap();

        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("WALLBOX_PASSWORD", "from-env"),
            ("WALLBOX_STATION", "999"),
            ("WALLBOX_UPDATE_INTERVAL_SECS", "not-a-number"),
            ("HA_TOKEN", "token"),
            ("WALLBOX_CONTROL_LISTEN", "0.0.0.0:9000"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::parse(MINIMAL).unwrap();

        config.apply_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.wallbox.password, "from-env");
        assert_eq!(config.wallbox.station, "999");
        assert_eq!(config.wallbox.update_interval_secs, 30);
        assert_eq!(config.home_assistant.token.as_deref(), Some("token"));
        assert_eq!(config.home_assistant.base_url, None);
        assert_eq!(config.control.listen, "0.0.0.0:9000");
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AppConfig::parse(MINIMAL).unwrap();
        config.home_assistant.entity_prefix = "Garage Box".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::parse(MINIMAL).unwrap();
        config.wallbox.password.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::parse(MINIMAL).unwrap();
        config.api.base_url = "api.wall-box.com".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::parse(MINIMAL).unwrap();
        config.control.listen = "localhost".to_string();
        assert!(config.validate().is_err());
        config.control.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_secrets_are_not_serialized() {
        let mut config = AppConfig::parse(MINIMAL).unwrap();
        config.home_assistant.token = Some("token".to_string());

        let toml_str = toml::to_string_pretty(&config).unwrap();

        assert!(!toml_str.contains("secret"));
        assert!(!toml_str.contains("token ="));
    }
}
