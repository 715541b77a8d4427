//! Base HTTP client facade for the generation API
//!
//! The single point where requests are built and transport failures are
//! normalized: bearer auth is merged in from the session, non-success
//! statuses become `RequestFailed` carrying the response body (or the
//! caller's fallback message), and JSON bodies are decoded here.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::ApiConfig;
use crate::errors::{ApiError, ApiResult};
use crate::logger::{self, LogTag};
use crate::session::AuthSession;

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<AuthSession>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<AuthSession>) -> ApiResult<Self> {
        // Validate early so a broken base URL fails at startup, not mid-action
        Url::parse(&config.base_url)
            .map_err(|e| ApiError::Config(format!("invalid api.base_url: {}", e)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ApiError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.session.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a prepared request and normalize every failure into `ApiError`
    async fn send(&self, builder: RequestBuilder, fallback: &str) -> ApiResult<Response> {
        let response = builder.send().await.map_err(|e| ApiError::RequestFailed {
            status: None,
            detail: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = extract_error_detail(&body, fallback);
            logger::debug(
                LogTag::Api,
                &format!("Request rejected with HTTP {}: {}", status.as_u16(), detail),
            );
            return Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                detail,
            });
        }

        Ok(response)
    }

    /// Decode a success response: 204/empty bodies are an error for typed
    /// reads, JSON content parses into T
    async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        if response.status() == StatusCode::NO_CONTENT {
            return Err(ApiError::Decode("unexpected empty response".to_string()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> ApiResult<T> {
        let response = self.send(self.builder(Method::GET, path), fallback).await?;
        Self::read_json(response).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> ApiResult<T> {
        let response = self
            .send(self.builder(Method::POST, path).json(body), fallback)
            .await?;
        Self::read_json(response).await
    }

    /// POST without a request body (cancel/retry/send style endpoints)
    pub async fn post_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> ApiResult<T> {
        let response = self.send(self.builder(Method::POST, path), fallback).await?;
        Self::read_json(response).await
    }

    pub async fn patch_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> ApiResult<T> {
        let response = self
            .send(self.builder(Method::PATCH, path).json(body), fallback)
            .await?;
        Self::read_json(response).await
    }

    /// DELETE resolving with no value; 204 and status bodies both accepted
    pub async fn delete(&self, path: &str, fallback: &str) -> ApiResult<()> {
        self.send(self.builder(Method::DELETE, path), fallback)
            .await?;
        Ok(())
    }

    /// Upload one multipart form (a single file per call)
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        fallback: &str,
    ) -> ApiResult<T> {
        let response = self
            .send(self.builder(Method::POST, path).multipart(form), fallback)
            .await?;
        Self::read_json(response).await
    }

    /// Fetch raw bytes (artifact downloads)
    pub async fn get_bytes(&self, path: &str, fallback: &str) -> ApiResult<Vec<u8>> {
        let response = self.send(self.builder(Method::GET, path), fallback).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Turn an error body into a displayable detail string
///
/// The server answers with either plain text or a JSON `{"detail": ...}`
/// envelope; an empty body falls back to the caller-provided message.
fn extract_error_detail(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(detail) = value.get("detail") {
            if let Some(text) = detail.as_str() {
                return text.to_string();
            }
            return detail.to_string();
        }
    }

    trimmed.to_string()
}
