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
use crate::control::{self, Action, ControlClient, EntityReport};
use crate::setup::WallboxEntry;
use anyhow::Result;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn run(config_path: &Path, config: &AppConfig) -> Result<()> {
    let entry = WallboxEntry::setup(config).await?;
    let running = entry.start(config).await?;
    let mut reloads = reload_signals()?;
    if let Some(addr) = running.control_addr() {
        info!("🎛️ Accepting commands on http://{}/api/command", addr);
    }

    info!(
        "🚀 Wallbox bridge running for station {}, press Ctrl+C to stop or send SIGHUP to reload",
        running.coordinator().station()
    );
    let shutdown = async { tokio::signal::ctrl_c().await.map_err(anyhow::Error::from) };
    let outcome = running.supervise(config_path, &mut reloads, shutdown).await;

    running.unload();
    outcome
}

/// SIGHUP as a stream of reload requests; never fires on other platforms
#[cfg(unix)]
fn reload_signals() -> Result<mpsc::Receiver<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            // a reload already queued covers this one
            let _ = tx.try_send(());
        }
    });
    Ok(rx)
}

#[cfg(not(unix))]
fn reload_signals() -> Result<mpsc::Receiver<()>> {
    let (_tx, rx) = mpsc::channel(1);
    Ok(rx)
}

pub async fn validate(config: &AppConfig) -> Result<()> {
    let entry = WallboxEntry::setup(config).await?;
    let data = entry.coordinator.data();
    println!(
        "Credentials OK, station {} reports '{}'",
        entry.coordinator.station(),
        data.as_deref().map_or("Unknown", |d| d.status_description())
    );
    Ok(())
}

pub async fn status(config: &AppConfig) -> Result<()> {
    if let Some(client) = bridge_client(config)?
        && let Some(entities) = client.status().await?
    {
        print_entities(&entities);
        return Ok(());
    }

    let entry = WallboxEntry::setup(config).await?;
    print_entities(&control::report(&entry.entities));
    Ok(())
}

/// Send `action` to the running bridge, or straight to the charger when none is running
pub async fn execute(config: &AppConfig, action: Action) -> Result<()> {
    if let Some(client) = bridge_client(config)? {
        if let Some(entities) = client.execute(action).await? {
            info!("✅ Running bridge applied '{}'", action);
            print_entities(&entities);
            return Ok(());
        }
        warn!("No running bridge found, talking to the charger directly");
    }

    let entry = WallboxEntry::setup(config).await?;
    control::apply(&entry.entities, action).await?;
    print_entities(&control::report(&entry.entities));
    Ok(())
}

fn bridge_client(config: &AppConfig) -> Result<Option<ControlClient>> {
    if !config.control.enabled {
        return Ok(None);
    }
    ControlClient::new(config.control.socket_addr()?).map(Some)
}

fn print_entities(entities: &[EntityReport]) {
    for entity in entities {
        println!(
            "{:<8} {:<24} {} {}",
            entity.platform,
            entity.name,
            entity.state,
            entity.unit.as_deref().unwrap_or_default()
        );
    }
}
