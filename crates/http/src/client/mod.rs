//! Contacts API client

pub mod auth;
pub mod contacts;
pub mod error;
mod refresh;
pub mod request;

pub use error::ClientError;
pub use request::PendingRequest;

use contacts_core::{ClientConfig, SessionStore, TerminationReason};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, ClientBuilder, Method, StatusCode, header};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Contacts API client
///
/// Cheap to clone; clones share the HTTP connection pool, the session and
/// the refresh lock.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    // Serialises token refreshes so concurrent 401s share one refresh call
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new(
        base_url: impl Into<String>,
        session: Arc<SessionStore>,
    ) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).session(session).build()
    }

    /// Create a client from loaded configuration
    pub fn from_config(
        config: &ClientConfig,
        session: Arc<SessionStore>,
    ) -> Result<Self, ClientError> {
        Self::builder()
            .base_url(&config.api_url)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .session(session)
            .build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Session shared with this client
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    /// Describe an authenticated request
    pub fn request(&self, method: Method, path: &str) -> PendingRequest {
        PendingRequest::new(method, path)
    }

    pub fn get(&self, path: &str) -> PendingRequest {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> PendingRequest {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> PendingRequest {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> PendingRequest {
        self.request(Method::DELETE, path)
    }

    /// Execute a request and decode the JSON response
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: PendingRequest,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Execute a request whose response body is irrelevant
    pub async fn execute_empty(&self, request: PendingRequest) -> Result<(), ClientError> {
        let response = self.send(request).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Send a request through the unauthorized-response interceptor
    ///
    /// Any response other than 401 is returned untouched, including other
    /// error statuses. A 401 on an authenticated request triggers one token
    /// refresh and one replay of the request with the new token.
    pub async fn send(&self, mut request: PendingRequest) -> Result<reqwest::Response, ClientError> {
        request.check()?;

        let mut bearer = if request.authenticated {
            self.inner.session.access_token()
        } else {
            None
        };

        loop {
            let response = self.dispatch(&request, bearer.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            if request.is_refresh() {
                return Err(self.expire(TerminationReason::RefreshRejected));
            }

            if request.retried {
                warn!(path = %request.path, "Request rejected again after token refresh");
                return Err(error_from_response(response).await);
            }
            if !request.authenticated {
                return Err(error_from_response(response).await);
            }

            debug!(path = %request.path, "Access token rejected, refreshing");
            request.mark_retried();
            bearer = Some(self.refresh_after(bearer.as_deref()).await?);
        }
    }

    async fn dispatch(
        &self,
        request: &PendingRequest,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ClientError> {
        let url = format!("{}{}", self.inner.base_url, request.path);
        let mut headers = request.headers.clone();
        if bearer.is_some() {
            headers.remove(AUTHORIZATION);
        }

        let mut builder = self
            .inner
            .client
            .request(request.method.clone(), url)
            .headers(headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        debug!(
            method = %request.method,
            path = %request.path,
            retried = request.retried,
            "Dispatching request"
        );
        Ok(builder.send().await?)
    }
}

/// Turn a non-success response into an error, keeping the backend message
async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::from_status(status, &body)
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    session: Option<Arc<SessionStore>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the session the client reads tokens from and refreshes
    pub fn session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
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

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let session = self
            .session
            .ok_or_else(|| ClientError::Configuration("session is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| format!("contacts-client/{}", env!("CARGO_PKG_VERSION"))),
        );

        let client = client_builder.build()?;

        Ok(ApiClient {
            inner: Arc::new(Inner {
                client,
                base_url,
                session,
                refresh_lock: Mutex::new(()),
            }),
        })
    }
}
