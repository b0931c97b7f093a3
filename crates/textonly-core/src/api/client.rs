//! API client for communicating with the TextOnly REST API.
//!
//! This module provides the `ApiClient` struct, the single request executor
//! used by every command. It attaches the standard headers, resolves the
//! bearer token for protected routes, and classifies response statuses.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Environment variable that supplies a bearer token directly, bypassing the
/// credential store. Intended for CI and scripts.
pub const TOKEN_ENV_VAR: &str = "TO_TOKEN";

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Produces the bearer token for authenticated requests, or fails when none
/// is available.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> anyhow::Result<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> anyhow::Result<String> + Send + Sync,
{
    fn token(&self) -> anyhow::Result<String> {
        self()
    }
}

/// Reads an environment variable; swapped out in tests.
type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// User agent sent with every request: `to/<version> (<os>/<arch>)`.
pub fn user_agent() -> String {
    format!(
        "to/{} ({}/{})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// API client for TextOnly.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token_provider: Option<Arc<dyn TokenProvider>>,
    env_lookup: Arc<EnvLookup>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Create a client with a custom request timeout.
    /// Proxy settings are picked up from the environment by reqwest.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()?;

        Ok(Self {
            client,
            base_url: crate::config::normalize_base_url(base_url),
            token_provider: None,
            env_lookup: Arc::new(|name: &str| std::env::var(name).ok()),
        })
    }

    /// Set the capability used to resolve tokens for authenticated requests
    pub fn with_token_provider(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    /// Replace how environment variables such as `TO_TOKEN` are read
    pub fn with_env_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env_lookup = Arc::new(lookup);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Resolve the bearer token: environment override first, then the
    /// injected provider. `None` means the request goes out unauthenticated.
    fn resolve_token(&self) -> Option<String> {
        if let Some(token) = (self.env_lookup)(TOKEN_ENV_VAR) {
            let token = token.trim();
            if !token.is_empty() {
                debug!(var = TOKEN_ENV_VAR, "Using token from environment");
                return Some(token.to_string());
            }
        }

        let provider = self.token_provider.as_ref()?;
        match provider.token() {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "No token available, sending request unauthenticated");
                None
            }
        }
    }

    /// Execute a request and return the raw response body on success.
    ///
    /// Any status >= 300 becomes an [`ApiError`] carrying the status code and
    /// the body text.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        requires_auth: bool,
    ) -> Result<String, ApiError> {
        let url = self.url(path);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::ACCEPT, "application/json");

        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(serde_json::to_vec(body)?);
        }

        if requires_auth {
            if let Some(token) = self.resolve_token() {
                request = request.bearer_auth(token);
            }
        }

        debug!(%method, url = %url, requires_auth, "Sending API request");
        let response = request.send().await?;
        let status = response.status();

        if status.as_u16() < 300 {
            Ok(response.text().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(%method, url = %url, status = status.as_u16(), "API request failed");
            Err(ApiError::from_status(status, body))
        }
    }

    /// Send an unauthenticated request and report the status code as-is,
    /// without classifying it. Only transport failures are errors.
    pub async fn status_of(&self, method: Method, path: &str) -> Result<u16, ApiError> {
        let url = self.url(path);
        let response = self
            .client
            .request(method, &url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    /// Execute a request and decode the JSON response body into `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        requires_auth: bool,
    ) -> Result<T, ApiError> {
        let text = self.send(method, path, body, requires_auth).await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        requires_auth: bool,
    ) -> Result<T, ApiError> {
        self.call(Method::GET, path, None, requires_auth).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
        requires_auth: bool,
    ) -> Result<T, ApiError> {
        self.call(Method::POST, path, body, requires_auth).await
    }
}
