//! Client error types

use contacts_core::ValidationErrors;
use thiserror::Error;

/// Shown to users whose session could not be recovered
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server rejected the credentials and no refresh was possible
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Token refresh failed; the session has been cleared
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// Server returned any other error status
    #[error("Request failed with status {status}: {}", .message.as_deref().unwrap_or("no message"))]
    RequestFailed {
        status: u16,
        message: Option<String>,
    },

    /// Form input rejected before anything was sent
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from HTTP status code and response body
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = backend_message(body);
        if status == reqwest::StatusCode::UNAUTHORIZED {
            Self::Unauthorized(message.unwrap_or_else(|| status.to_string()))
        } else {
            Self::RequestFailed {
                status: status.as_u16(),
                message,
            }
        }
    }

    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }

    /// HTTP status the server answered with, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Text suitable for a user-facing notification
    ///
    /// Uses the backend-provided message when there is one and `fallback`
    /// otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::RequestFailed {
                message: Some(message),
                ..
            } => message.clone(),
            Self::SessionExpired(_) => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::Validation(errors) => errors.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// Pull the human-readable message out of an error body
///
/// The API answers `{"message": "..."}`; token endpoints use `{"detail": "..."}`.
pub(crate) fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let field = value.get("message").or_else(|| value.get("detail"))?;
    match field {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn extracts_message_field() {
        assert_eq!(
            backend_message(r#"{"message": "Contact not found"}"#).as_deref(),
            Some("Contact not found")
        );
        assert_eq!(
            backend_message(r#"{"detail": "Token is invalid or expired"}"#).as_deref(),
            Some("Token is invalid or expired")
        );
        assert_eq!(
            backend_message(r#"{"message": ["a", "b"]}"#).as_deref(),
            Some("a, b")
        );
        assert_eq!(backend_message("<html>oops</html>"), None);
        assert_eq!(backend_message(r#"{"other": 1}"#), None);
    }

    #[test]
    fn maps_status_codes() {
        assert!(matches!(
            ClientError::from_status(StatusCode::UNAUTHORIZED, ""),
            ClientError::Unauthorized(_)
        ));
        assert!(matches!(
            ClientError::from_status(StatusCode::NOT_FOUND, r#"{"message": "gone"}"#),
            ClientError::RequestFailed { status: 404, message: Some(ref m) } if m == "gone"
        ));
    }

    #[test]
    fn user_message_prefers_backend_text() {
        let err = ClientError::from_status(StatusCode::BAD_REQUEST, r#"{"message": "name, required"}"#);
        assert_eq!(err.user_message("Failed to add contact"), "name, required");

        let err = ClientError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.user_message("Failed to add contact"), "Failed to add contact");

        let err = ClientError::SessionExpired("refresh token rejected".into());
        assert_eq!(err.user_message("ignored"), SESSION_EXPIRED_MESSAGE);
    }
}
