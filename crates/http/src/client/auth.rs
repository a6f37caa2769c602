//! Authentication API client methods

use super::{ApiClient, ClientError};
use serde::{Deserialize, Serialize};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Email and password pair sent to login and register
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Tokens issued on login
///
/// The API has been seen to name the tokens either `access`/`refresh` or
/// `access_token`/`refresh_token`; both are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(alias = "access_token")]
    pub access: String,
    #[serde(alias = "refresh_token")]
    pub refresh: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    #[serde(default)]
    pub access: Option<String>,
    // Present when the server rotates refresh tokens
    #[serde(default)]
    pub refresh: Option<String>,
}

impl ApiClient {
    /// Exchange credentials for tokens
    ///
    /// Does not touch the session; see `AuthService::login`.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError> {
        let request = self.post(LOGIN_PATH).public().json(credentials);
        self.execute(request).await
    }

    /// Create an account
    pub async fn register(&self, credentials: &Credentials) -> Result<(), ClientError> {
        let request = self.post(REGISTER_PATH).public().json(credentials);
        self.execute_empty(request).await
    }
}
