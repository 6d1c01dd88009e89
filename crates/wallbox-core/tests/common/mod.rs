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

//! In-memory stand-in for the Wallbox cloud used by the coordinator tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use wallbox_api::{WallboxError, WallboxResult};
use wallbox_core::ChargerApi;

pub const STATION: &str = "12345";

pub fn charger_document() -> Map<String, Value> {
    match json!({
        "name": "Garage",
        "status_id": 194,
        "charging_power": 7.456,
        "max_available_power": 32,
        "charging_speed": 0,
        "added_range": 12.6,
        "added_energy": 3.14159,
        "charging_time": 3725,
        "charging_current": 15.5,
        "cost": 1.2,
        "state_of_charge": null,
        "current_mode": 1,
        "depot_price": 0.25,
        "user_id": 4242,
        "user_name": "Jana",
        "car_id": null,
        "car_plate": "1AB 2345",
        "last_sync": { "date": "2025-05-01 10:15:00.000000", "timezone_type": 3, "timezone": "UTC" },
        "config_data": {
            "max_charging_current": 16,
            "locked": 0,
            "serial_number": "20000",
            "part_number": "PLP1-0-2-4-9-002",
            "software": { "currentVersion": "5.5.10" }
        }
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn api_error(status: u16) -> WallboxError {
    WallboxError::ApiError {
        status,
        message: format!("HTTP {status}"),
    }
}

/// Fake charger that applies commands to its document the way the portal does
#[derive(Debug)]
pub struct FakeApi {
    pub document: Mutex<Map<String, Value>>,
    pub auth_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub commands: Mutex<Vec<String>>,
    pub auth_failure: Mutex<Option<u16>>,
    pub status_failure: Mutex<Option<u16>>,
    pub command_failure: Mutex<Option<u16>>,
    authenticated: AtomicBool,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::with_document(charger_document())
    }

    pub fn with_document(document: Map<String, Value>) -> Self {
        Self {
            document: Mutex::new(document),
            auth_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
            auth_failure: Mutex::new(None),
            status_failure: Mutex::new(None),
            command_failure: Mutex::new(None),
            authenticated: AtomicBool::new(false),
        }
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn fail_auth_with(&self, status: Option<u16>) {
        *self.auth_failure.lock() = status;
    }

    pub fn fail_status_with(&self, status: Option<u16>) {
        *self.status_failure.lock() = status;
    }

    pub fn fail_commands_with(&self, status: Option<u16>) {
        *self.command_failure.lock() = status;
    }

    pub fn set_config(&self, key: &str, value: Value) {
        let mut document = self.document.lock();
        if let Some(Value::Object(config)) = document.get_mut("config_data") {
            config.insert(key.to_string(), value);
        }
    }

    pub fn set_field(&self, key: &str, value: Value) {
        self.document.lock().insert(key.to_string(), value);
    }

    fn command(&self, name: String) -> WallboxResult<()> {
        if let Some(status) = *self.command_failure.lock() {
            return Err(api_error(status));
        }
        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(WallboxError::NotAuthenticated);
        }
        self.commands.lock().push(name);
        Ok(())
    }
}

#[async_trait]
impl ChargerApi for FakeApi {
    async fn authenticate(&self) -> WallboxResult<()> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = *self.auth_failure.lock() {
            self.authenticated.store(false, Ordering::SeqCst);
            return Err(api_error(status));
        }
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn get_charger_status(&self, _station: &str) -> WallboxResult<Map<String, Value>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = *self.status_failure.lock() {
            return Err(api_error(status));
        }
        Ok(self.document.lock().clone())
    }

    async fn set_max_charging_current(&self, _station: &str, amps: f64) -> WallboxResult<()> {
        self.command(format!("current:{amps}"))?;
        self.set_config("max_charging_current", json!(amps));
        Ok(())
    }

    async fn lock_charger(&self, _station: &str) -> WallboxResult<()> {
        self.command("lock".to_string())?;
        self.set_config("locked", json!(1));
        Ok(())
    }

    async fn unlock_charger(&self, _station: &str) -> WallboxResult<()> {
        self.command("unlock".to_string())?;
        self.set_config("locked", json!(0));
        Ok(())
    }

    async fn pause_charging_session(&self, _station: &str) -> WallboxResult<()> {
        self.command("pause".to_string())?;
        self.set_field("status_id", json!(182));
        Ok(())
    }

    async fn resume_charging_session(&self, _station: &str) -> WallboxResult<()> {
        self.command("resume".to_string())?;
        self.set_field("status_id", json!(194));
        Ok(())
    }
}
