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

use crate::errors::{CoordinatorError, CoordinatorResult};
use crate::snapshot::ChargerStatus;
use crate::traits::ChargerApi;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use wallbox_api::WallboxError;

/// Default polling interval
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Session lifecycle of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    /// Credentials rejected; only `reconfigure` or a successful `validate_credentials` leaves this state
    AuthInvalid,
}

/// What subscribers observe after every refresh attempt
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    /// Last good snapshot; kept when a later refresh fails
    pub data: Option<Arc<ChargerStatus>>,
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub auth_failed: bool,
}

/// Remote commands a user can issue through the entities
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChargerCommand {
    SetMaxChargingCurrent(f64),
    Lock,
    Unlock,
    Pause,
    Resume,
}

impl fmt::Display for ChargerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetMaxChargingCurrent(amps) => write!(f, "set max charging current to {amps} A"),
            Self::Lock => write!(f, "lock"),
            Self::Unlock => write!(f, "unlock"),
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
        }
    }
}

/// Owns the session, the poll timer and the latest snapshot for one station
pub struct WallboxCoordinator {
    station: String,
    api: RwLock<Arc<dyn ChargerApi>>,
    update_interval: Duration,
    session: Mutex<SessionState>,
    // Serializes fetches and commands
    in_flight: tokio::sync::Mutex<()>,
    state_tx: watch::Sender<CoordinatorState>,
}

impl fmt::Debug for WallboxCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WallboxCoordinator")
            .field("station", &self.station)
            .field("update_interval", &self.update_interval)
            .field("session", &*self.session.lock())
            .finish_non_exhaustive()
    }
}

impl WallboxCoordinator {
    pub fn new(station: impl Into<String>, api: Arc<dyn ChargerApi>) -> Self {
        let (state_tx, _) = watch::channel(CoordinatorState::default());
        Self {
            station: station.into(),
            api: RwLock::new(api),
            update_interval: UPDATE_INTERVAL,
            session: Mutex::new(SessionState::Unauthenticated),
            in_flight: tokio::sync::Mutex::new(()),
            state_tx,
        }
    }

    pub fn with_update_interval(mut self, update_interval: Duration) -> Self {
        self.update_interval = update_interval;
        self
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn session_state(&self) -> SessionState {
        *self.session.lock()
    }

    /// Register a subscriber; the poll timer only fetches while at least one exists
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state_tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state_tx.receiver_count()
    }

    /// Latest published state
    pub fn state(&self) -> CoordinatorState {
        self.state_tx.borrow().clone()
    }

    /// Latest good snapshot, if any
    pub fn data(&self) -> Option<Arc<ChargerStatus>> {
        self.state_tx.borrow().data.clone()
    }

    /// Swap in a client built from re-entered credentials
    pub fn reconfigure(&self, api: Arc<dyn ChargerApi>) {
        info!("🔧 Reconfiguring Wallbox coordinator for station {}", self.station);
        *self.api.write() = api;
        self.set_session(SessionState::Unauthenticated);
        self.state_tx.send_modify(|state| state.auth_failed = false);
    }

    /// Authenticate unless a valid session is already held
    pub async fn authenticate(&self) -> CoordinatorResult<()> {
        let _guard = self.in_flight.lock().await;
        self.ensure_authenticated(&self.api()).await
    }

    /// Always performs a fresh login; used when an entry is set up or credentials are re-entered
    pub async fn validate_credentials(&self) -> CoordinatorResult<()> {
        let _guard = self.in_flight.lock().await;
        self.login(&self.api()).await
    }

    /// Authenticate and fetch a snapshot without publishing it
    pub async fn fetch_status(&self) -> CoordinatorResult<ChargerStatus> {
        let _guard = self.in_flight.lock().await;
        self.fetch_locked().await
    }

    /// Fetch and publish a snapshot. On failure the previous snapshot stays published
    pub async fn refresh_now(&self) -> CoordinatorResult<Arc<ChargerStatus>> {
        let _guard = self.in_flight.lock().await;
        self.refresh_locked().await
    }

    /// Caller holds `in_flight`, so snapshots are published in fetch order
    async fn refresh_locked(&self) -> CoordinatorResult<Arc<ChargerStatus>> {
        match self.fetch_locked().await {
            Ok(status) => {
                let status = Arc::new(status);
                let published = Arc::clone(&status);
                self.state_tx.send_modify(move |state| {
                    state.data = Some(published);
                    state.last_update_success = true;
                    state.last_error = None;
                    state.last_updated = Some(Utc::now());
                    state.auth_failed = false;
                });
                debug!(
                    "✅ Wallbox {} refreshed: {}",
                    self.station,
                    status.status_description()
                );
                Ok(status)
            }
            Err(e) => {
                if e.is_auth_failure() {
                    error!("❌ Wallbox {} update failed: {}", self.station, e);
                } else {
                    warn!("⚠️ Wallbox {} update failed, will retry: {}", self.station, e);
                }
                let message = e.to_string();
                let auth_failed = e.is_auth_failure();
                self.state_tx.send_modify(move |state| {
                    state.last_update_success = false;
                    state.last_error = Some(message);
                    state.auth_failed = auth_failed;
                });
                Err(e)
            }
        }
    }

    pub async fn set_max_charging_current(&self, amps: f64) -> CoordinatorResult<()> {
        self.execute(ChargerCommand::SetMaxChargingCurrent(amps))
            .await
    }

    pub async fn set_lock(&self, lock: bool) -> CoordinatorResult<()> {
        let command = if lock {
            ChargerCommand::Lock
        } else {
            ChargerCommand::Unlock
        };
        self.execute(command).await
    }

    pub async fn pause_resume(&self, pause: bool) -> CoordinatorResult<()> {
        let command = if pause {
            ChargerCommand::Pause
        } else {
            ChargerCommand::Resume
        };
        self.execute(command).await
    }

    /// Run a command, then refresh before returning so callers never read a stale snapshot
    pub async fn execute(&self, command: ChargerCommand) -> CoordinatorResult<()> {
        let _guard = self.in_flight.lock().await;
        let api = self.api();
        self.ensure_authenticated(&api).await?;

        info!("📤 Wallbox {}: {}", self.station, command);
        let station = self.station.as_str();
        let result = match command {
            ChargerCommand::SetMaxChargingCurrent(amps) => {
                api.set_max_charging_current(station, amps).await
            }
            ChargerCommand::Lock => api.lock_charger(station).await,
            ChargerCommand::Unlock => api.unlock_charger(station).await,
            ChargerCommand::Pause => api.pause_charging_session(station).await,
            ChargerCommand::Resume => api.resume_charging_session(station).await,
        };
        result.map_err(|e| self.command_error(command, e))?;

        if let Err(e) = self.refresh_locked().await {
            debug!("Refresh after '{}' failed: {}", command, e);
        }
        Ok(())
    }

    /// Start the poll timer. Dropping or stopping the handle stops polling
    pub fn spawn_polling(self: &Arc<Self>) -> PollingHandle {
        let coordinator = Arc::clone(self);
        let period = self.update_interval;
        info!(
            "⏱️ Polling Wallbox {} every {:?}",
            self.station, period
        );

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if coordinator.subscriber_count() == 0 {
                    trace!("No subscribers for Wallbox {}, skipping poll", coordinator.station);
                    continue;
                }
                // Failures are published to subscribers and retried on the next tick
                let _ = coordinator.refresh_now().await;
            }
        });

        PollingHandle { handle }
    }

    fn api(&self) -> Arc<dyn ChargerApi> {
        Arc::clone(&*self.api.read())
    }

    fn set_session(&self, state: SessionState) {
        *self.session.lock() = state;
    }

    async fn ensure_authenticated(&self, api: &Arc<dyn ChargerApi>) -> CoordinatorResult<()> {
        match self.session_state() {
            SessionState::AuthInvalid => {
                return Err(CoordinatorError::AuthFailed(
                    "credentials were rejected, reconfigure the Wallbox entry".to_string(),
                ));
            }
            SessionState::Authenticated if api.is_authenticated() => return Ok(()),
            SessionState::Authenticated | SessionState::Unauthenticated => {}
        }
        self.login(api).await
    }

    async fn login(&self, api: &Arc<dyn ChargerApi>) -> CoordinatorResult<()> {
        debug!("🔑 Authenticating against {} for station {}", api.name(), self.station);
        match api.authenticate().await {
            Ok(()) => {
                self.set_session(SessionState::Authenticated);
                Ok(())
            }
            Err(e) => {
                let err = CoordinatorError::from_auth(e);
                if err.is_auth_failure() {
                    error!("❌ Wallbox credentials rejected for station {}", self.station);
                    self.set_session(SessionState::AuthInvalid);
                } else {
                    self.set_session(SessionState::Unauthenticated);
                }
                Err(err)
            }
        }
    }

    async fn fetch_locked(&self) -> CoordinatorResult<ChargerStatus> {
        let api = self.api();
        self.ensure_authenticated(&api).await?;

        let raw = api
            .get_charger_status(&self.station)
            .await
            .map_err(|e| {
                self.expire_session_on(&e);
                CoordinatorError::Connectivity(e)
            })?;
        Ok(ChargerStatus::from_raw(raw))
    }

    fn command_error(&self, command: ChargerCommand, err: WallboxError) -> CoordinatorError {
        self.expire_session_on(&err);
        if err.is_forbidden() {
            warn!("❌ Wallbox {} refused '{}': {}", self.station, command, err);
            CoordinatorError::AuthFailed(err.to_string())
        } else {
            CoordinatorError::Connectivity(err)
        }
    }

    // A 401 or a missing token means the session is gone; log in again next time
    fn expire_session_on(&self, err: &WallboxError) {
        if err.status() == Some(401) || matches!(err, WallboxError::NotAuthenticated) {
            let mut session = self.session.lock();
            if *session == SessionState::Authenticated {
                *session = SessionState::Unauthenticated;
            }
        }
    }
}

/// Running poll timer; aborts the timer task when stopped or dropped
#[derive(Debug)]
pub struct PollingHandle {
    handle: JoinHandle<()>,
}

impl PollingHandle {
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
