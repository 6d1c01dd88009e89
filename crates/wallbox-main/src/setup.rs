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

use crate::config::AppConfig;
use crate::control;
use anyhow::{Context, Result, bail};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use wallbox_core::{
    ChargerApi, CoordinatorError, CoordinatorState, PollingHandle, WallboxCoordinator,
    WallboxEntities,
};
use wallbox_ha::{EntityPublisher, HomeAssistantClient, StateSink};

/// A configured charger: coordinator plus its entities
pub struct WallboxEntry {
    pub coordinator: Arc<WallboxCoordinator>,
    pub entities: Arc<WallboxEntities>,
}

/// Background tasks of a running entry
#[derive(Debug)]
pub struct RunningEntry {
    coordinator: Arc<WallboxCoordinator>,
    polling: PollingHandle,
    publisher: JoinHandle<()>,
    control: Option<(SocketAddr, JoinHandle<()>)>,
}

impl WallboxEntry {
    /// Validate credentials, perform the first refresh and build the entities.
    /// Fails when the charger cannot be reached yet so the caller can retry later
    pub async fn setup(config: &AppConfig) -> Result<Self> {
        let client = config.wallbox.build_client(&config.api)?;
        let api: Arc<dyn ChargerApi> = Arc::new(client);
        let coordinator = Arc::new(
            WallboxCoordinator::new(config.wallbox.station.clone(), api)
                .with_update_interval(config.wallbox.update_interval()),
        );

        match coordinator.validate_credentials().await {
            Ok(()) => {}
            Err(CoordinatorError::AuthFailed(reason)) => {
                bail!("Wallbox rejected the configured credentials: {reason}")
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context("Cannot connect to the Wallbox portal"));
            }
        }

        coordinator
            .refresh_now()
            .await
            .with_context(|| format!("First refresh of station {} failed", config.wallbox.station))?;

        let entities = Arc::new(WallboxEntities::new(&coordinator)?);
        info!(
            "✅ Wallbox station {} ready ({} entities)",
            coordinator.station(),
            entities.all().len()
        );
        Ok(Self {
            coordinator,
            entities,
        })
    }

    /// Start polling, publishing and the control endpoint. Without Home Assistant
    /// the updates are only logged
    pub async fn start(self, config: &AppConfig) -> Result<RunningEntry> {
        let listener = if config.control.enabled {
            let addr = config.control.socket_addr()?;
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("Cannot listen for control requests on {addr}"))?;
            Some((listener.local_addr()?, listener))
        } else {
            None
        };

        let publisher = if config.home_assistant.enabled {
            let ha_client = HomeAssistantClient::from_config(
                config.home_assistant.base_url.clone(),
                config.home_assistant.token.clone(),
            )?;
            if !ha_client.ping().await? {
                warn!("⚠️ Home Assistant at {} is not responding yet", ha_client.base_url());
            }

            let sink: Arc<dyn StateSink> = Arc::new(ha_client);
            let publisher = Arc::new(
                EntityPublisher::new(
                    sink,
                    Arc::clone(&self.coordinator),
                    Arc::clone(&self.entities),
                    config.wallbox.name.clone(),
                )
                .with_prefix(config.home_assistant.entity_prefix.clone()),
            );
            publisher.spawn(self.coordinator.subscribe())
        } else {
            log_updates(&self.coordinator)
        };

        let control = listener
            .map(|(addr, listener)| (addr, control::serve(listener, Arc::clone(&self.entities))));

        let polling = self.coordinator.spawn_polling();
        Ok(RunningEntry {
            coordinator: self.coordinator,
            polling,
            publisher,
            control,
        })
    }
}

impl std::fmt::Debug for WallboxEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallboxEntry")
            .field("coordinator", &self.coordinator)
            .field("entities", &self.entities)
            .finish()
    }
}

impl RunningEntry {
    pub fn coordinator(&self) -> &Arc<WallboxCoordinator> {
        &self.coordinator
    }

    /// Bound address of the control endpoint, if it is enabled
    pub fn control_addr(&self) -> Option<SocketAddr> {
        self.control.as_ref().map(|(addr, _)| *addr)
    }

    /// Swap in credentials from a reloaded configuration and refresh with them
    pub async fn reconfigure(&self, config: &AppConfig) -> Result<()> {
        if config.wallbox.station != self.coordinator.station() {
            warn!(
                "⚠️ Station changed to {}, restart the bridge to switch chargers",
                config.wallbox.station
            );
        }

        let client = config.wallbox.build_client(&config.api)?;
        self.coordinator.reconfigure(Arc::new(client));
        self.coordinator
            .validate_credentials()
            .await
            .context("Reloaded Wallbox credentials were not accepted")?;
        self.coordinator.refresh_now().await?;
        info!("🔄 Wallbox credentials reloaded");
        Ok(())
    }

    /// Keep the entry running until `shutdown` resolves. Every message on `reloads`
    /// re-reads `config_path` and reconfigures the entry. Rejected credentials
    /// end the entry with an error
    pub async fn supervise(
        &self,
        config_path: &Path,
        reloads: &mut mpsc::Receiver<()>,
        shutdown: impl Future<Output = Result<()>>,
    ) -> Result<()> {
        let mut updates = self.coordinator.subscribe();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = &mut shutdown => {
                    result?;
                    info!("🛑 Shutdown requested");
                    return Ok(());
                }
                Some(reason) = credentials_rejected(&mut updates) => {
                    error!("❌ Stopping, Wallbox credentials were rejected: {}", reason);
                    bail!("Wallbox rejected the configured credentials: {reason}");
                }
                Some(()) = reloads.recv() => {
                    info!("🔧 Reloading configuration from {}", config_path.display());
                    let reloaded = match AppConfig::load(config_path) {
                        Ok(config) => self.reconfigure(&config).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = reloaded {
                        warn!("⚠️ Configuration reload failed: {:#}", e);
                    }
                }
            }
        }
    }

    /// Stop the poll timer, the publisher and the control endpoint
    pub fn unload(self) {
        self.polling.stop();
        self.publisher.abort();
        if let Some((_, control)) = self.control {
            control.abort();
        }
        info!("🛑 Wallbox entry unloaded");
    }
}

/// Resolves with the error once the coordinator reports rejected credentials;
/// `None` when the coordinator is gone
pub async fn credentials_rejected(
    updates: &mut watch::Receiver<CoordinatorState>,
) -> Option<String> {
    let state = updates.wait_for(|state| state.auth_failed).await.ok()?;
    Some(
        state
            .last_error
            .clone()
            .unwrap_or_else(|| "no reason given".to_owned()),
    )
}

fn log_updates(coordinator: &Arc<WallboxCoordinator>) -> JoinHandle<()> {
    let mut updates = coordinator.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            match (&state.data, state.last_update_success) {
                (Some(data), true) => info!("🔄 Wallbox status: {}", data.status_description()),
                _ => warn!(
                    "⚠️ Wallbox update failed: {}",
                    state.last_error.as_deref().unwrap_or("unknown error")
                ),
            }
        }
    })
}
