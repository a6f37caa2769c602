//! Access token refresh

use super::auth::{REFRESH_PATH, RefreshRequest, RefreshResponse};
use super::{ApiClient, ClientError, PendingRequest, error_from_response};
use contacts_core::TerminationReason;
use reqwest::{Method, StatusCode};

impl ApiClient {
    /// Obtain a new access token with the stored refresh token
    ///
    /// On failure the session is terminated and `SessionExpired` returned.
    pub async fn refresh_access_token(&self) -> Result<String, ClientError> {
        let _guard = self.inner.refresh_lock.lock().await;
        self.request_new_token().await
    }

    /// Refresh on behalf of a request that was rejected while using `stale`
    ///
    /// If another request already replaced `stale` while this one waited for
    /// the lock, the current token is reused and no refresh call is made.
    pub(super) async fn refresh_after(&self, stale: Option<&str>) -> Result<String, ClientError> {
        let _guard = self.inner.refresh_lock.lock().await;

        match self.inner.session.access_token() {
            Some(current) if stale != Some(current.as_str()) => {
                debug!("Access token was refreshed concurrently, reusing it");
                Ok(current)
            }
            // Session ended while this request waited; it was already terminated
            None if stale.is_some() => {
                debug!("Session ended during a concurrent refresh");
                Err(ClientError::SessionExpired(
                    "session ended by a concurrent refresh".into(),
                ))
            }
            _ => self.request_new_token().await,
        }
    }

    // Caller holds the refresh lock
    async fn request_new_token(&self) -> Result<String, ClientError> {
        let session = &self.inner.session;
        let Some(refresh) = session.refresh_token() else {
            return Err(self.expire(TerminationReason::MissingRefreshToken));
        };

        let request = PendingRequest::new(Method::POST, REFRESH_PATH)
            .public()
            .json(&RefreshRequest { refresh });

        let response = match self.dispatch(&request, None).await {
            Ok(response) => response,
            Err(e) => return Err(self.expire(TerminationReason::RefreshFailed(e.to_string()))),
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(self.expire(TerminationReason::RefreshRejected));
        }
        if !status.is_success() {
            let err = error_from_response(response).await;
            return Err(self.expire(TerminationReason::RefreshFailed(err.to_string())));
        }

        let body: RefreshResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => return Err(self.expire(TerminationReason::RefreshFailed(e.to_string()))),
        };

        let Some(access) = body.access.filter(|t| !t.is_empty()) else {
            return Err(self.expire(TerminationReason::RefreshFailed(
                "response did not contain an access token".into(),
            )));
        };

        let rotated = body.refresh.as_deref().filter(|t| !t.is_empty());
        session.apply_refreshed_token(&access, rotated);
        info!("Access token refreshed");
        Ok(access)
    }

    /// Terminate the session and build the error handed to the caller
    pub(super) fn expire(&self, reason: TerminationReason) -> ClientError {
        let message = reason.to_string();
        self.inner.session.terminate(reason);
        ClientError::SessionExpired(message)
    }
}
