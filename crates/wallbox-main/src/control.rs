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

//! Local control endpoint of a running bridge.
//!
//! The CLI subcommands and Home Assistant `rest_command`s post actions here so they
//! run through the bridge's own coordinator, which refreshes and republishes the
//! entities afterwards.

use anyhow::{Context, Result, bail};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wallbox_core::{CoordinatorError, CoordinatorResult, WallboxEntities, WallboxEntity};
use wallbox_ha::publisher::render_state;

/// Commands accepted by the charger entities
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Lock,
    Unlock,
    Pause,
    Resume,
    SetCurrent { amps: f64 },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => write!(f, "lock"),
            Self::Unlock => write!(f, "unlock"),
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
            Self::SetCurrent { amps } => write!(f, "set current to {amps} A"),
        }
    }
}

/// Run `action` through the entity that owns it
pub async fn apply(entities: &WallboxEntities, action: Action) -> CoordinatorResult<()> {
    match action {
        Action::Lock => entities.lock.lock().await,
        Action::Unlock => entities.lock.unlock().await,
        Action::Pause => entities.switch.turn_on().await,
        Action::Resume => entities.switch.turn_off().await,
        Action::SetCurrent { amps } => entities.number.set_value(amps).await,
    }
}

/// One entity as printed by the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub platform: String,
    pub name: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

pub fn report(entities: &WallboxEntities) -> Vec<EntityReport> {
    entities
        .all()
        .into_iter()
        .map(|entity| EntityReport {
            platform: entity.platform().to_string(),
            name: entity.name().to_owned(),
            state: render_state(entity, &entity.state()),
            unit: entity.unit().map(str::to_owned),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub ok: bool,
    #[serde(default)]
    pub entities: Vec<EntityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ControlState {
    pub entities: Arc<WallboxEntities>,
}

pub fn router(entities: Arc<WallboxEntities>) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/command", post(command_handler))
        .with_state(ControlState { entities })
}

#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn status_handler(State(state): State<ControlState>) -> impl IntoResponse {
    Json(ControlResponse {
        ok: true,
        entities: report(&state.entities),
        error: None,
    })
}

pub async fn command_handler(
    State(state): State<ControlState>,
    Json(action): Json<Action>,
) -> impl IntoResponse {
    info!("🎛️ Control request: {}", action);
    match apply(&state.entities, action).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ControlResponse {
                ok: true,
                entities: report(&state.entities),
                error: None,
            }),
        ),
        Err(e) => {
            warn!("⚠️ Control request '{}' failed: {}", action, e);
            (
                status_code(&e),
                Json(ControlResponse {
                    ok: false,
                    entities: Vec::new(),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

fn status_code(err: &CoordinatorError) -> StatusCode {
    match err {
        CoordinatorError::InvalidValue(_) => StatusCode::BAD_REQUEST,
        CoordinatorError::AuthFailed(_) => StatusCode::FORBIDDEN,
        CoordinatorError::Connectivity(_) => StatusCode::BAD_GATEWAY,
        CoordinatorError::UnknownField(_) | CoordinatorError::InvalidField { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Serve the control API on `listener` until the handle is aborted
pub fn serve(listener: TcpListener, entities: Arc<WallboxEntities>) -> JoinHandle<()> {
    let app = router(entities);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            warn!("⚠️ Control endpoint stopped: {}", e);
        }
    })
}

/// Client side used by the CLI to reach a running bridge
#[derive(Debug, Clone)]
pub struct ControlClient {
    base_url: String,
    client: reqwest::Client,
}

impl ControlClient {
    /// Commands wait for the charger and the follow-up refresh
    const TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(addr: SocketAddr) -> Result<Self> {
        // a bridge listening on every interface is reached over loopback
        let addr = match addr {
            SocketAddr::V4(v4) if v4.ip().is_unspecified() => {
                SocketAddr::from((Ipv4Addr::LOCALHOST, v4.port()))
            }
            SocketAddr::V6(v6) if v6.ip().is_unspecified() => {
                SocketAddr::from((Ipv6Addr::LOCALHOST, v6.port()))
            }
            other => other,
        };
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .context("Failed to create control client")?;
        Ok(Self {
            base_url: format!("http://{addr}"),
            client,
        })
    }

    /// Entity states of the running bridge; `None` when no bridge is listening
    pub async fn status(&self) -> Result<Option<Vec<EntityReport>>> {
        let request = self.client.get(format!("{}/api/status", self.base_url));
        self.send(request, "status").await
    }

    /// Run `action` on the running bridge; `None` when no bridge is listening
    pub async fn execute(&self, action: Action) -> Result<Option<Vec<EntityReport>>> {
        let request = self
            .client
            .post(format!("{}/api/command", self.base_url))
            .json(&action);
        self.send(request, &action.to_string()).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<Option<Vec<EntityReport>>> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                debug!("No bridge at {}: {}", self.base_url, e);
                return Ok(None);
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Control request failed")),
        };

        let status = response.status();
        let body: ControlResponse = response
            .json()
            .await
            .with_context(|| format!("Unexpected control response ({status})"))?;
        if !status.is_success() || !body.ok {
            bail!(
                "Bridge refused '{}': {}",
                what,
                body.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(Some(body.entities))
    }
}
