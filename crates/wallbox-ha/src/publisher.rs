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

//! Mirrors Wallbox entities into Home Assistant as plain entity states.
//!
//! Every coordinator update is rendered once per entity and posted to
//! `/api/states/{platform}.{prefix}_{key}`. Entities whose field is missing or whose
//! last refresh failed are published as `unavailable`.

use crate::client::HomeAssistantClient;
use crate::errors::HaResult;
use crate::types::StatePayload;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wallbox_core::entities::WallboxNumber;
use wallbox_core::snapshot::keys;
use wallbox_core::{
    ChargerStatus, CoordinatorState, DeviceInfo, EntityState, EntityValue, Platform,
    WallboxCoordinator, WallboxEntities, WallboxEntity,
};

pub const UNAVAILABLE: &str = "unavailable";

/// Destination for rendered entity states
#[async_trait]
pub trait StateSink: Send + Sync {
    async fn publish(&self, entity_id: &str, payload: &StatePayload) -> HaResult<()>;
}

#[async_trait]
impl StateSink for HomeAssistantClient {
    async fn publish(&self, entity_id: &str, payload: &StatePayload) -> HaResult<()> {
        self.set_state(entity_id, payload).await.map(|_| ())
    }
}

pub struct EntityPublisher {
    sink: Arc<dyn StateSink>,
    coordinator: Arc<WallboxCoordinator>,
    entities: Arc<WallboxEntities>,
    prefix: String,
    /// Used for friendly names until the charger reports its own
    fallback_name: String,
}

impl fmt::Debug for EntityPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityPublisher")
            .field("prefix", &self.prefix)
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

impl EntityPublisher {
    pub fn new(
        sink: Arc<dyn StateSink>,
        coordinator: Arc<WallboxCoordinator>,
        entities: Arc<WallboxEntities>,
        fallback_name: impl Into<String>,
    ) -> Self {
        Self {
            sink,
            coordinator,
            entities,
            prefix: wallbox_core::DOMAIN.to_string(),
            fallback_name: fallback_name.into(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn entity_id(&self, entity: &dyn WallboxEntity) -> String {
        format!("{}.{}_{}", entity.platform(), self.prefix, entity.key())
    }

    /// Render every entity from the latest coordinator state and post it.
    /// Returns how many entities were published
    pub async fn publish_all(&self) -> HaResult<usize> {
        let data = self.coordinator.data();
        let mut published = 0;
        let mut last_error = None;

        for entity in self.entities.all() {
            let entity_id = self.entity_id(entity);
            let payload = self.payload(entity, data.as_deref());
            match self.sink.publish(&entity_id, &payload).await {
                Ok(()) => published += 1,
                Err(e) => {
                    warn!("⚠️ Failed to publish {}: {}", entity_id, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if published == 0 => Err(e),
            _ => {
                debug!("📤 Published {} Wallbox entities", published);
                Ok(published)
            }
        }
    }

    /// Publish now and after every coordinator update; abort the handle to stop
    pub fn spawn(self: Arc<Self>, mut updates: watch::Receiver<CoordinatorState>) -> JoinHandle<()> {
        info!("📡 Publishing Wallbox entities with prefix '{}'", self.prefix);
        tokio::spawn(async move {
            loop {
                if let Err(e) = self.publish_all().await {
                    warn!("⚠️ Publishing to Home Assistant failed: {}", e);
                }
                if updates.changed().await.is_err() {
                    debug!("Coordinator dropped, publisher stopping");
                    break;
                }
            }
        })
    }

    pub fn payload(
        &self,
        entity: &dyn WallboxEntity,
        status: Option<&ChargerStatus>,
    ) -> StatePayload {
        let state = entity.state();
        let device = status.and_then(|s| DeviceInfo::from_status(s).ok());
        let device_name = status
            .and_then(|s| s.text(keys::NAME).ok())
            .unwrap_or(self.fallback_name.as_str());

        let mut payload = StatePayload::new(render_state(entity, &state))
            .with_attribute(
                "friendly_name",
                Some(format!("{} {}", device_name, entity.name())),
            )
            .with_attribute("icon", entity.icon(status))
            .with_attribute("unit_of_measurement", entity.unit())
            .with_attribute("device_class", entity.device_class())
            .with_attribute("unique_id", status.and_then(|s| entity.unique_id(s)))
            .with_attribute(
                "device",
                device.and_then(|d| serde_json::to_value(d).ok()),
            );

        if let Some(status) = status {
            payload.attributes.extend(entity.attributes(status));
        }

        if entity.platform() == Platform::Number {
            if let Some(number) = self.number_entity(entity) {
                payload = payload
                    .with_attribute("min", Some(number.min_value()))
                    .with_attribute("max", Some(number.max_value()))
                    .with_attribute("step", Some(number.step()));
            }
        }
        payload
    }

    fn number_entity(&self, entity: &dyn WallboxEntity) -> Option<&WallboxNumber> {
        (entity.key() == self.entities.number.key()).then_some(&self.entities.number)
    }
}

/// Host-facing state string of an entity
pub fn render_state(entity: &dyn WallboxEntity, state: &EntityState) -> String {
    let Some(value) = state.value() else {
        return UNAVAILABLE.to_string();
    };

    match (entity.platform(), value) {
        (Platform::Lock, EntityValue::Bool(locked)) => {
            String::from(if *locked { "locked" } else { "unlocked" })
        }
        (_, EntityValue::Bool(on)) => String::from(if *on { "on" } else { "off" }),
        (_, EntityValue::Number(number)) => match entity.precision() {
            Some(precision) => format!("{:.*}", usize::from(precision), number),
            None => number.to_string(),
        },
        (_, EntityValue::Text(text)) => text.clone(),
    }
}
