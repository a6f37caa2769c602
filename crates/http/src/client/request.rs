//! Replayable request descriptions

use super::auth::REFRESH_PATH;
use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

/// An outbound call captured so it can be sent again
///
/// Unlike a `reqwest::RequestBuilder`, a `PendingRequest` can be dispatched
/// more than once: the interceptor replays it with a fresh token after a
/// refresh. The `retried` marker is set before the replay and never cleared,
/// which caps automatic retries at one per logical request.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Bytes>,
    pub(crate) authenticated: bool,
    pub(crate) retried: bool,
    invalid: Option<String>,
}

impl PendingRequest {
    /// Describe an authenticated call to `path` (relative to the API base URL)
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            authenticated: true,
            retried: false,
            invalid: None,
        }
    }

    /// Send without a bearer token and without refresh handling
    #[must_use]
    pub fn public(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Set a header, replacing any previous value
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.invalidate(format!("invalid header '{name}'")),
        }
        self
    }

    /// Attach a JSON body
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(e) => self.invalidate(format!("failed to serialize body: {e}")),
        }
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub const fn is_retried(&self) -> bool {
        self.retried
    }

    /// Whether this is the token refresh call itself
    pub fn is_refresh(&self) -> bool {
        self.path == REFRESH_PATH
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Surface any error recorded while building
    pub(crate) fn check(&self) -> Result<(), super::ClientError> {
        match &self.invalid {
            Some(reason) => Err(super::ClientError::InvalidRequest(reason.clone())),
            None => Ok(()),
        }
    }

    fn invalidate(&mut self, reason: String) {
        // Keep the first problem
        self.invalid.get_or_insert(reason);
    }
}
