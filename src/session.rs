//! Auth session manager
//!
//! Holds the bearer token for the lifetime of the process. One shared
//! instance is created at startup and injected into the HTTP facade; the
//! token is written once per authentication exchange (or once when falling
//! back to a stored token) and read by every request.
//!
//! Resolution order on startup:
//! 1. Telegram WebApp init data from the configured environment variable ->
//!    exchange it for a fresh bearer token via POST /auth/telegram.
//! 2. No init data but a previously stored token exists -> adopt it directly.
//! 3. Neither -> `AuthContextMissing`.

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::api::client::ApiClient;
use crate::api::types::{TelegramAuthRequest, TokenResponse};
use crate::config::AuthConfig;
use crate::errors::{ApiError, ApiResult};
use crate::logger::{self, LogTag};
use crate::paths;

pub struct AuthSession {
    init_data_env: String,
    remember_token: bool,
    token_path: PathBuf,
    token: RwLock<Option<String>>,
}

impl AuthSession {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            &config.init_data_env,
            config.remember_token,
            paths::get_token_file(),
        )
    }

    pub fn new(init_data_env: &str, remember_token: bool, token_path: PathBuf) -> Self {
        Self {
            init_data_env: init_data_env.to_string(),
            remember_token,
            token_path,
            token: RwLock::new(None),
        }
    }

    /// Currently held bearer token, if any
    pub fn bearer_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.bearer_token().is_some()
    }

    fn set_token(&self, token: &str) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.to_string());
        }
    }

    /// Adopt an externally issued bearer token without an exchange
    /// (stored-token fallback and explicit `auth token` imports)
    pub fn adopt_token(&self, token: &str) {
        self.set_token(token);
    }

    /// Obtain a token: fresh exchange when init data is present, otherwise
    /// the stored-token fallback. Returns the source used for logging/UI.
    pub async fn resolve(&self, client: &ApiClient) -> ApiResult<TokenSource> {
        match self.read_init_data() {
            Some(init_data) => {
                self.exchange(client, &init_data).await?;
                Ok(TokenSource::Exchange)
            }
            None => match self.read_stored_token() {
                Some(stored) => {
                    self.adopt_token(&stored);
                    logger::info(LogTag::Auth, "Using stored bearer token (no init data)");
                    Ok(TokenSource::Stored)
                }
                None => Err(ApiError::AuthContextMissing),
            },
        }
    }

    /// Exchange Telegram init data for a bearer token and persist it
    pub async fn exchange(&self, client: &ApiClient, init_data: &str) -> ApiResult<()> {
        let request = TelegramAuthRequest {
            init_data: init_data.to_string(),
        };

        let response: TokenResponse = client
            .post_json("/auth/telegram", &request, "Authentication failed")
            .await
            .map_err(|e| match e {
                ApiError::RequestFailed { detail, .. } => ApiError::AuthExchangeFailed(detail),
                other => other,
            })?;

        self.set_token(&response.access_token);
        logger::info(LogTag::Auth, "Bearer token obtained");

        if self.remember_token {
            self.store_token(&response.access_token);
        }

        Ok(())
    }

    /// Drop the in-memory token and the stored copy
    pub fn logout(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
        if self.token_path.exists() {
            if let Err(e) = fs::remove_file(&self.token_path) {
                logger::warning(
                    LogTag::Auth,
                    &format!("Failed to remove stored token: {}", e),
                );
            }
        }
    }

    fn read_init_data(&self) -> Option<String> {
        std::env::var(&self.init_data_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    fn read_stored_token(&self) -> Option<String> {
        fs::read_to_string(&self.token_path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn store_token(&self, token: &str) {
        if let Some(parent) = self.token_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                logger::warning(
                    LogTag::Auth,
                    &format!("Failed to create token directory: {}", e),
                );
                return;
            }
        }
        if let Err(e) = fs::write(&self.token_path, token) {
            logger::warning(LogTag::Auth, &format!("Failed to store token: {}", e));
        }
    }
}

/// Where the current token came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Exchange,
    Stored,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::testutil::{MockApi, MockResponse};
    use std::sync::Arc;

    fn session_with(dir: &tempfile::TempDir, env_name: &str) -> AuthSession {
        AuthSession::new(env_name, true, dir.path().join("session.token"))
    }

    fn client_with(session: Arc<AuthSession>, base_url: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: base_url.to_string(),
            timeout_seconds: 5,
        };
        ApiClient::new(&config, session).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_without_context_fails() {
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(session_with(&dir, "ANKIGEN_TEST_UNSET_ENV"));
        // Unreachable base URL: resolution must fail before any request
        let client = client_with(session.clone(), "http://127.0.0.1:9/api");

        let err = session.resolve(&client).await.unwrap_err();
        assert!(matches!(err, ApiError::AuthContextMissing));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("session.token"), "stored-tok\n").unwrap();
        let session = Arc::new(session_with(&dir, "ANKIGEN_TEST_UNSET_ENV"));
        let client = client_with(session.clone(), "http://127.0.0.1:9/api");

        let source = session.resolve(&client).await.unwrap();
        assert_eq!(source, TokenSource::Stored);
        assert_eq!(session.bearer_token(), Some("stored-tok".to_string()));
    }

    #[tokio::test]
    async fn test_exchange_obtains_and_persists_token() {
        let mock = MockApi::start(vec![MockResponse::json(
            200,
            "{\"access_token\": \"fresh-tok\", \"token_type\": \"bearer\"}",
        )]);
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(session_with(&dir, "ANKIGEN_TEST_UNSET_ENV"));
        let client = client_with(session.clone(), &mock.base_url());

        session.exchange(&client, "query_id=abc&user=def").await.unwrap();
        assert_eq!(session.bearer_token(), Some("fresh-tok".to_string()));
        // remember_token persists the credential for future app loads
        let stored = std::fs::read_to_string(dir.path().join("session.token")).unwrap();
        assert_eq!(stored, "fresh-tok");

        let requests = mock.requests();
        assert_eq!(requests[0].path, "/api/auth/telegram");
        assert!(requests[0].body.contains("query_id=abc"));
        // The exchange itself goes out unauthenticated
        assert_eq!(requests[0].bearer, None);
    }

    #[tokio::test]
    async fn test_exchange_failure_carries_server_message() {
        let mock = MockApi::start(vec![MockResponse::json(
            400,
            "{\"detail\": \"Invalid init data signature\"}",
        )]);
        let dir = tempfile::tempdir().unwrap();
        let session = Arc::new(session_with(&dir, "ANKIGEN_TEST_UNSET_ENV"));
        let client = client_with(session.clone(), &mock.base_url());

        let err = session.exchange(&client, "tampered").await.unwrap_err();
        match err {
            ApiError::AuthExchangeFailed(detail) => {
                assert_eq!(detail, "Invalid init data signature");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_stored_token_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with(&dir, "ANKIGEN_TEST_UNSET_ENV");

        assert!(session.read_stored_token().is_none());
        session.store_token("tok-123");
        assert_eq!(session.read_stored_token(), Some("tok-123".to_string()));

        session.logout();
        assert!(session.read_stored_token().is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_token_visibility() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with(&dir, "ANKIGEN_TEST_UNSET_ENV");

        assert_eq!(session.bearer_token(), None);
        session.set_token("abc");
        assert_eq!(session.bearer_token(), Some("abc".to_string()));
        assert!(session.is_authenticated());
    }
}
