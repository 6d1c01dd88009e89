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

use crate::errors::{WallboxError, WallboxResult};
use crate::types::{AuthToken, RemoteAction, Session};
use chrono::Utc;
use parking_lot::RwLock;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Production endpoint of the Wallbox portal API
pub const DEFAULT_BASE_URL: &str = "https://api.wall-box.com";

/// Wallbox cloud REST API client
#[derive(Clone)]
pub struct WallboxClient {
    base_url: String,
    username: String,
    password: String,
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    session: Arc<RwLock<Option<Session>>>,
}

impl std::fmt::Debug for WallboxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallboxClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl WallboxClient {
    /// Create a client for the production API with a 10 second request timeout
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> WallboxResult<Self> {
        Self::with_timeout(username, password, Duration::from_secs(10))
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> WallboxResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json;charset=UTF-8"),
        );
        headers.insert("Partner", HeaderValue::from_static("wallbox"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| WallboxError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: username.into(),
            password: password.into(),
            client,
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Point the client at another API host (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom retry configuration
    pub fn with_retry_config(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a session token is held and has not expired yet
    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .as_ref()
            .is_some_and(|session| session.is_valid_at(Utc::now()))
    }

    /// Drop the current session so the next call has to authenticate again
    pub fn invalidate_session(&self) {
        *self.session.write() = None;
    }

    /// Obtain a fresh session token using HTTP basic auth
    pub async fn authenticate(&self) -> WallboxResult<()> {
        let url = format!("{}/auth/token/user", self.base_url);
        debug!("🔑 [WALLBOX AUTH] Requesting token for {}", self.username);

        let response = self
            .retry_request(|| async {
                self.client
                    .get(&url)
                    .basic_auth(&self.username, Some(&self.password))
                    .send()
                    .await
            })
            .await?;

        match response.status() {
            StatusCode::OK => {
                let token = response.json::<AuthToken>().await?;
                if token.jwt.is_empty() {
                    return Err(WallboxError::InvalidResponse(
                        "Token response carried an empty jwt".to_string(),
                    ));
                }
                let session = Session::from_token(token);
                debug!("✅ [WALLBOX AUTH] Token valid until {:?}", session.expires_at);
                *self.session.write() = Some(session);
                Ok(())
            }
            status => {
                self.invalidate_session();
                let message = response.text().await.unwrap_or_default();
                if status == StatusCode::FORBIDDEN {
                    error!("❌ [WALLBOX AUTH] Credentials rejected for {}", self.username);
                } else {
                    warn!("⚠️ [WALLBOX AUTH] Status {}: {}", status, message);
                }
                Err(WallboxError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Get the full status document of a charger
    pub async fn get_charger_status(&self, station: &str) -> WallboxResult<Map<String, Value>> {
        let url = format!("{}/chargers/status/{}", self.base_url, station);
        let token = self.bearer_token()?;
        debug!("🔍 [WALLBOX QUERY] Getting status for charger: {}", station);

        let response = self
            .retry_request(|| async { self.client.get(&url).bearer_auth(&token).send().await })
            .await?;
        let response = Self::check_status(response, "status").await?;

        match response.json::<Value>().await? {
            Value::Object(map) => {
                trace!("   Status fields: {:?}", map.keys().collect::<Vec<_>>());
                Ok(map)
            }
            other => Err(WallboxError::InvalidResponse(format!(
                "Expected a JSON object for charger {station}, got {other}"
            ))),
        }
    }

    /// Set the maximum charging current in amperes
    pub async fn set_max_charging_current(&self, station: &str, amps: f64) -> WallboxResult<()> {
        info!("⚡ [WALLBOX COMMAND] {}: max charging current = {} A", station, amps);
        self.put_charger(station, json!({ "maxChargingCurrent": amps }))
            .await
    }

    pub async fn lock_charger(&self, station: &str) -> WallboxResult<()> {
        info!("🔒 [WALLBOX COMMAND] {}: lock", station);
        self.put_charger(station, json!({ "locked": 1 })).await
    }

    pub async fn unlock_charger(&self, station: &str) -> WallboxResult<()> {
        info!("🔓 [WALLBOX COMMAND] {}: unlock", station);
        self.put_charger(station, json!({ "locked": 0 })).await
    }

    pub async fn pause_charging_session(&self, station: &str) -> WallboxResult<()> {
        self.remote_action(station, RemoteAction::Pause).await
    }

    pub async fn resume_charging_session(&self, station: &str) -> WallboxResult<()> {
        self.remote_action(station, RemoteAction::Resume).await
    }

    async fn put_charger(&self, station: &str, body: Value) -> WallboxResult<()> {
        let url = format!("{}/v2/charger/{}", self.base_url, station);
        let token = self.bearer_token()?;
        debug!("   URL: {}", url);

        let response = self
            .retry_request(|| async {
                self.client
                    .put(&url)
                    .bearer_auth(&token)
                    .json(&body)
                    .send()
                    .await
            })
            .await?;

        Self::check_status(response, "charger update").await?;
        Ok(())
    }

    async fn remote_action(&self, station: &str, action: RemoteAction) -> WallboxResult<()> {
        let url = format!("{}/v3/chargers/{}/remote-action", self.base_url, station);
        let token = self.bearer_token()?;
        let body = json!({ "action": action.to_i32() });
        info!(
            "⏯️ [WALLBOX COMMAND] {}: {}",
            station,
            action.display_name()
        );

        let response = self
            .retry_request(|| async {
                self.client
                    .post(&url)
                    .bearer_auth(&token)
                    .json(&body)
                    .send()
                    .await
            })
            .await?;

        Self::check_status(response, action.display_name()).await?;
        Ok(())
    }

    fn bearer_token(&self) -> WallboxResult<String> {
        self.session
            .read()
            .as_ref()
            .map(|session| session.token.clone())
            .ok_or(WallboxError::NotAuthenticated)
    }

    async fn check_status(response: Response, operation: &str) -> WallboxResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        error!("❌ [WALLBOX ERROR] {} failed with status {}: {}", operation, status, message);
        Err(WallboxError::ApiError {
            status: status.as_u16(),
            message,
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut>(&self, mut request_fn: F) -> WallboxResult<Response>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay;

        loop {
            attempts += 1;
            match request_fn().await {
                Ok(response) => return Ok(response),
                Err(e) if attempts >= self.max_retries => {
                    error!("Request failed after {} attempts: {}", attempts, e);
                    return Err(WallboxError::HttpError(e));
                }
                Err(e) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempts, self.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    // base64("user:secret")
    const BASIC_AUTH: &str = "Basic dXNlcjpzZWNyZXQ=";

    fn test_client(url: String) -> WallboxClient {
        WallboxClient::new("user", "secret")
            .unwrap()
            .with_base_url(url)
            .with_retry_config(1, Duration::from_millis(10))
    }

    async fn mock_auth(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/auth/token/user")
            .match_header("authorization", BASIC_AUTH)
            .match_header("partner", "wallbox")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jwt": "test_jwt", "ttl": 4102444800000_i64 }).to_string())
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let mut server = Server::new_async().await;
        let mock = mock_auth(&mut server).await;

        let client = test_client(server.url());
        assert!(!client.is_authenticated());
        client.authenticate().await.unwrap();

        assert!(client.is_authenticated());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_forbidden() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/auth/token/user")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let client = test_client(server.url());
        let err = client.authenticate().await.unwrap_err();

        assert!(err.is_forbidden());
        assert!(!client.is_authenticated());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_server_error_is_not_forbidden() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/auth/token/user")
            .with_status(500)
            .create_async()
            .await;

        let client = test_client(server.url());
        let err = client.authenticate().await.unwrap_err();

        assert!(!err.is_forbidden());
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_status_requires_session() {
        let client = test_client("http://localhost".to_string());
        let result = client.get_charger_status("12345").await;

        assert!(matches!(result, Err(WallboxError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_get_charger_status() {
        let mut server = Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let mock = server
            .mock("GET", "/chargers/status/12345")
            .match_header("authorization", "Bearer test_jwt")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "status_id": 193,
                    "charging_power": 7.4,
                    "config_data": { "max_charging_current": 16, "locked": 0 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(server.url());
        client.authenticate().await.unwrap();
        let status = client.get_charger_status("12345").await.unwrap();

        assert_eq!(status["status_id"], json!(193));
        assert_eq!(status["config_data"]["max_charging_current"], json!(16));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_charger_status_rejects_non_object() {
        let mut server = Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let _mock = server
            .mock("GET", "/chargers/status/12345")
            .with_status(200)
            .with_body("[1, 2, 3]")
            .create_async()
            .await;

        let client = test_client(server.url());
        client.authenticate().await.unwrap();
        let result = client.get_charger_status("12345").await;

        assert!(matches!(result, Err(WallboxError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_lock_and_unlock_bodies() {
        let mut server = Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let lock = server
            .mock("PUT", "/v2/charger/12345")
            .match_body(Matcher::Json(json!({ "locked": 1 })))
            .with_status(200)
            .create_async()
            .await;
        let unlock = server
            .mock("PUT", "/v2/charger/12345")
            .match_body(Matcher::Json(json!({ "locked": 0 })))
            .with_status(200)
            .create_async()
            .await;

        let client = test_client(server.url());
        client.authenticate().await.unwrap();
        client.lock_charger("12345").await.unwrap();
        client.unlock_charger("12345").await.unwrap();

        lock.assert_async().await;
        unlock.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_max_charging_current() {
        let mut server = Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let mock = server
            .mock("PUT", "/v2/charger/12345")
            .match_header("authorization", "Bearer test_jwt")
            .match_body(Matcher::Json(json!({ "maxChargingCurrent": 16.0 })))
            .with_status(200)
            .create_async()
            .await;

        let client = test_client(server.url());
        client.authenticate().await.unwrap();
        client.set_max_charging_current("12345", 16.0).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_pause_and_resume_actions() {
        let mut server = Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let pause = server
            .mock("POST", "/v3/chargers/12345/remote-action")
            .match_body(Matcher::Json(json!({ "action": 2 })))
            .with_status(200)
            .create_async()
            .await;
        let resume = server
            .mock("POST", "/v3/chargers/12345/remote-action")
            .match_body(Matcher::Json(json!({ "action": 1 })))
            .with_status(200)
            .create_async()
            .await;

        let client = test_client(server.url());
        client.authenticate().await.unwrap();
        client.pause_charging_session("12345").await.unwrap();
        client.resume_charging_session("12345").await.unwrap();

        pause.assert_async().await;
        resume.assert_async().await;
    }

    #[tokio::test]
    async fn test_command_error_status() {
        let mut server = Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let _mock = server
            .mock("PUT", "/v2/charger/12345")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = test_client(server.url());
        client.authenticate().await.unwrap();
        let err = client.lock_charger("12345").await.unwrap_err();

        assert!(matches!(err, WallboxError::ApiError { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_exhausts_retries() {
        // Nothing listens on port 1
        let client = WallboxClient::new("user", "secret")
            .unwrap()
            .with_base_url("http://127.0.0.1:1")
            .with_retry_config(2, Duration::from_millis(5));

        let err = client.authenticate().await.unwrap_err();

        assert!(matches!(err, WallboxError::HttpError(_)));
        assert!(!err.is_forbidden());
    }
}
