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

/// Wallbox API error types
#[derive(Error, Debug)]
pub enum WallboxError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Wallbox API returned error status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Not authenticated, call authenticate() first")]
    NotAuthenticated,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WallboxError {
    /// HTTP status attached to the failure, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True only for a 403 answer; the Wallbox portal uses it for rejected credentials
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }
}

pub type WallboxResult<T> = Result<T, WallboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_detection() {
        let forbidden = WallboxError::ApiError {
            status: 403,
            message: String::new(),
        };
        let server_error = WallboxError::ApiError {
            status: 500,
            message: "boom".to_string(),
        };

        assert!(forbidden.is_forbidden());
        assert!(!server_error.is_forbidden());
        assert_eq!(server_error.status(), Some(500));
        assert_eq!(WallboxError::NotAuthenticated.status(), None);
        assert!(!WallboxError::InvalidResponse("x".to_string()).is_forbidden());
    }
}
