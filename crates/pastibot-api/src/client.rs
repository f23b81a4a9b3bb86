//! HTTP client for the Pastibot backend.
//!
//! One `ApiClient` is shared by every flow. The bearer token lives in a
//! shared slot that login fills and logout empties; each request reads
//! the slot at send time, so a token swap applies to everything
//! in flight after it.

use crate::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Default per-request timeout when none is configured.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// REST client for the Pastibot backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: String,
    bearer: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// Create a new client for the given backend base URL.
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a new client with an explicit per-request timeout.
    ///
    /// The base URL is validated here so a misconfigured backend address
    /// fails at startup, not at the first request.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        url::Url::parse(&base_url)?;

        Ok(Self {
            http_client,
            base_url,
            bearer: Arc::new(RwLock::new(None)),
        })
    }

    /// The backend base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the full URL for an endpoint path.
    fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach a bearer token to all subsequent requests.
    ///
    /// Synchronous so logout never has to await anything. The lock is held
    /// only for the assignment, never across a request.
    pub fn set_bearer(&self, token: &str) {
        let mut bearer = self.bearer.write().unwrap();
        *bearer = Some(token.to_string());
    }

    /// Detach the bearer token.
    pub fn clear_bearer(&self) {
        let mut bearer = self.bearer.write().unwrap();
        *bearer = None;
    }

    /// The currently attached bearer token, if any.
    pub fn bearer(&self) -> Option<String> {
        self.bearer.read().unwrap().clone()
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http_client
            .request(method, self.endpoint_url(path))
            .header("Accept", "application/json");

        if let Some(token) = self.bearer() {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        builder
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        tracing::debug!(path = %path, "GET");
        let response = self.request(reqwest::Method::GET, path).send().await?;
        Self::decode(response).await
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        tracing::debug!(path = %path, "POST");
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// POST where the response body is irrelevant (or empty).
    pub(crate) async fn post_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<()> {
        tracing::debug!(path = %path, "POST");
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    pub(crate) async fn patch_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        tracing::debug!(path = %path, "PATCH");
        let response = self
            .request(reqwest::Method::PATCH, path)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub(crate) async fn patch_unit<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<()> {
        tracing::debug!(path = %path, "PATCH");
        let response = self
            .request(reqwest::Method::PATCH, path)
            .json(body)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    pub(crate) async fn delete_unit(&self, path: &str) -> ApiResult<()> {
        tracing::debug!(path = %path, "DELETE");
        let response = self
            .request(reqwest::Method::DELETE, path)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ApiError::Decode(format!("{} ({})", e, summarize_response_body(&body)))
        })
    }

    async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Self::error_for(status, &body))
    }

    fn error_for(status: reqwest::StatusCode, body: &str) -> ApiError {
        let code = status.as_u16();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return ApiError::Unauthorized {
                status: code,
                message: extract_message(status, body),
            };
        }

        if status.is_server_error() {
            let body_summary = summarize_response_body(body);
            tracing::error!(status = %status, body_summary = %body_summary, "Backend server error");
            return ApiError::Server {
                status: code,
                body_summary,
            };
        }

        ApiError::Rejected {
            status: code,
            message: extract_message(status, body),
        }
    }
}

/// Pull the human-readable message out of a backend error body.
///
/// The backend sends `{"message": "..."}`; validation failures arrive as
/// `{"message": ["...", "..."]}`. Anything else falls back to the raw
/// body (short bodies only) or the status code.
fn extract_message(status: reqwest::StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: MessageField,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MessageField {
        One(String),
        Many(Vec<String>),
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return match parsed.message {
            MessageField::One(m) => m,
            MessageField::Many(ms) => ms.join("; "),
        };
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 200 {
        return trimmed.to_string();
    }
    format!("request failed with status {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_building() {
        let client = ApiClient::new("https://api.pastibot.example/").unwrap();
        assert_eq!(client.base_url(), "https://api.pastibot.example");
        assert_eq!(
            client.endpoint_url("/auth/login"),
            "https://api.pastibot.example/auth/login"
        );
    }

    #[test]
    fn test_rejects_unparseable_base_url() {
        let err = ApiClient::new("not a url").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_bearer_set_and_clear() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        assert_eq!(client.bearer(), None);

        client.set_bearer("tok-123");
        assert_eq!(client.bearer(), Some("tok-123".to_string()));

        client.clear_bearer();
        assert_eq!(client.bearer(), None);
    }

    #[test]
    fn test_bearer_shared_across_clones() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        let clone = client.clone();

        client.set_bearer("tok-shared");
        assert_eq!(clone.bearer(), Some("tok-shared".to_string()));

        clone.clear_bearer();
        assert_eq!(client.bearer(), None);
    }

    #[test]
    fn test_error_for_unauthorized() {
        let err = ApiClient::error_for(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"message": "Token inválido"}"#,
        );
        match err {
            ApiError::Unauthorized { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Token inválido");
            }
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_error_for_validation_message_array() {
        let err = ApiClient::error_for(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"message": ["email must be an email", "password too short"]}"#,
        );
        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "email must be an email; password too short");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_error_for_server_error_is_transient() {
        let err = ApiClient::error_for(reqwest::StatusCode::BAD_GATEWAY, "upstream died");
        assert!(err.is_transient());
        match err {
            ApiError::Server { status, .. } => assert_eq!(status, 502),
            other => panic!("expected Server, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_message_falls_back_to_body() {
        let msg = extract_message(reqwest::StatusCode::BAD_REQUEST, "plain failure text");
        assert_eq!(msg, "plain failure text");
    }

    #[test]
    fn test_extract_message_falls_back_to_status_for_long_bodies() {
        let long_body = "x".repeat(500);
        let msg = extract_message(reqwest::StatusCode::BAD_REQUEST, &long_body);
        assert!(msg.contains("400"));
    }
}
