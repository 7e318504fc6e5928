//! BloomKart HTTP client
//!
//! Every request goes through [`BloomKartClient::execute`], which attaches
//! the bearer token (refreshing it first when close to expiry) and, on a 401,
//! refreshes and resubmits at most once before ending the session.

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod error;
pub mod orders;
pub mod payment_methods;
pub mod products;
pub mod reviews;
pub mod session;
pub mod store;
pub mod token;

use auth::AuthApi;
use bloomkart_core::{ClientConfig, KeyValueStore, MemoryStore, SessionConfig};
use error::ClientError;
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, ClientBuilder, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use session::{Bearer, SessionManager};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Paths whose 401 means bad credentials rather than an expired session
const REFRESH_EXEMPT_PATHS: [&str; 2] = ["/auth/login", "/auth/register"];

/// Per-request bookkeeping for the response interceptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    retries_remaining: u8,
    refresh_exempt: bool,
}

impl RequestContext {
    /// Context for a request to `path` with a budget of one retry
    pub fn for_path(path: &str) -> Self {
        Self {
            retries_remaining: 1,
            refresh_exempt: REFRESH_EXEMPT_PATHS
                .iter()
                .any(|exempt| path.ends_with(exempt)),
        }
    }

    pub const fn is_refresh_exempt(&self) -> bool {
        self.refresh_exempt
    }

    pub const fn retries_remaining(&self) -> u8 {
        self.retries_remaining
    }

    /// Consume one retry, returning false when the budget is spent
    pub const fn take_retry(&mut self) -> bool {
        if self.retries_remaining == 0 {
            return false;
        }
        self.retries_remaining -= 1;
        true
    }
}

/// Map a non-success response to a [`ClientError`]
pub(crate) async fn error_for_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| status.to_string());
    Err(ClientError::from_status(status, message))
}

/// BloomKart API client
#[derive(Clone)]
pub struct BloomKartClient {
    client: Client,
    base_url: String,
    session: Arc<SessionManager>,
}

impl BloomKartClient {
    /// Create a client with an in-memory session store
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> BloomKartClientBuilder {
        BloomKartClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session shared by this client
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Create a request builder for `path` below the base URL
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Execute a request and decode the JSON response
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Execute a request whose response body is not needed
    pub async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ClientError> {
        let request = request.build()?;
        let mut context = RequestContext::for_path(request.url().path());

        let (mut bearer, session_ended) = if context.is_refresh_exempt() {
            (None, false)
        } else {
            match self.session.authorization().await? {
                Bearer::Token(token) => (Some(token), false),
                Bearer::Anonymous => (None, false),
                Bearer::Ended => (None, true),
            }
        };

        loop {
            let attempt = authorize(&request, bearer.as_deref())?;
            let response = self.client.execute(attempt).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED && !context.is_refresh_exempt() {
                if session_ended {
                    return Err(ClientError::Refresh(
                        "session ended; sign in again".into(),
                    ));
                }
                if context.take_retry() {
                    debug!(path = request.url().path(), "Request rejected; refreshing session");
                    let stale = bearer.unwrap_or_default();
                    bearer = Some(self.session.renew(&stale).await?);
                    continue;
                }
                self.session.expire("request rejected after token refresh");
                return Err(ClientError::Refresh(
                    "request rejected after token refresh".into(),
                ));
            }

            if status == StatusCode::FORBIDDEN {
                warn!(path = request.url().path(), "Access forbidden");
            } else if status.is_server_error() {
                error!(path = request.url().path(), status = status.as_u16(), "Server error");
            }
            return error_for_status(response).await;
        }
    }
}

/// Copy the request with the bearer header set
fn authorize(request: &Request, bearer: Option<&str>) -> Result<Request, ClientError> {
    let mut attempt = request
        .try_clone()
        .ok_or_else(|| ClientError::Configuration("request body cannot be replayed".into()))?;
    if let Some(token) = bearer {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ClientError::Validation(format!("access token: {e}")))?;
        value.set_sensitive(true);
        attempt.headers_mut().insert(header::AUTHORIZATION, value);
    }
    Ok(attempt)
}

/// Builder for BloomKartClient
#[derive(Default)]
pub struct BloomKartClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    store: Option<Arc<dyn KeyValueStore>>,
    session_config: SessionConfig,
}

impl BloomKartClientBuilder {
    /// Start from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::default()
            .base_url(config.api.base_url.clone())
            .timeout(config.api.timeout())
            .user_agent(config.api.user_agent.clone())
            .session_config(config.session.clone())
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Persist tokens in `store` instead of memory
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set refresh threshold and login redirect
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<BloomKartClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| concat!("bloomkart-client/", env!("CARGO_PKG_VERSION")).into()),
        );

        let client = client_builder.build()?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>);
        let backend = AuthApi::new(client.clone(), base_url.clone());
        let session = SessionManager::new(store, Arc::new(backend), &self.session_config);

        Ok(BloomKartClient {
            client,
            base_url,
            session: Arc::new(session),
        })
    }
}
