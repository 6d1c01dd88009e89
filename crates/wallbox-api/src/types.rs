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

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before the reported expiry at which a session is treated as stale
const SESSION_EXPIRY_MARGIN_SECS: i64 = 60;

/// Body of `GET /auth/token/user`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub jwt: String,
    /// Expiry as epoch milliseconds
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// Authenticated session held by the client
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn from_token(token: AuthToken) -> Self {
        let expires_at = token.ttl.and_then(DateTime::from_timestamp_millis);
        Self {
            token: token.jwt,
            expires_at,
        }
    }

    /// A session without expiry stays valid until it is replaced
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(SESSION_EXPIRY_MARGIN_SECS) < expires_at,
            None => true,
        }
    }
}

/// Action codes accepted by `POST /v3/chargers/{id}/remote-action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    Resume,
    Pause,
}

impl RemoteAction {
    pub fn to_i32(self) -> i32 {
        match self {
            Self::Resume => 1,
            Self::Pause => 2,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::Pause => "pause",
        }
    }
}
