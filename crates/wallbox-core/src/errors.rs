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

use thiserror::Error;
use wallbox_api::WallboxError;

/// Errors surfaced by the coordinator and the entity adapters
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Credentials were rejected; stays this way until the entry is reconfigured
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Transport or server failure, retried on the next poll
    #[error("Wallbox API unavailable: {0}")]
    Connectivity(#[source] WallboxError),

    #[error("Field not present in charger status: {0}")]
    UnknownField(String),

    #[error("Field '{key}' has unexpected value: {value}")]
    InvalidField { key: String, value: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl CoordinatorError {
    /// Classify an authentication failure: 403 means rejected credentials, anything else is connectivity
    pub fn from_auth(err: WallboxError) -> Self {
        if err.is_forbidden() {
            Self::AuthFailed(err.to_string())
        } else {
            Self::Connectivity(err)
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthFailed(_))
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_classification() {
        let forbidden = CoordinatorError::from_auth(WallboxError::ApiError {
            status: 403,
            message: "denied".to_string(),
        });
        assert!(forbidden.is_auth_failure());
        assert!(!forbidden.is_connectivity());

        let unauthorized = CoordinatorError::from_auth(WallboxError::ApiError {
            status: 401,
            message: String::new(),
        });
        assert!(unauthorized.is_connectivity());

        let broken = CoordinatorError::from_auth(WallboxError::InvalidResponse("x".to_string()));
        assert!(broken.is_connectivity());
    }
}
