//! Authentication service

use crate::client::auth::Credentials;
use crate::client::{ApiClient, ClientError};
use contacts_core::SessionStore;
use contacts_core::validation::{LoginForm, SignUpForm};
use std::sync::Arc;

/// Login, registration and logout on top of the shared session
#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.client.session()
    }

    /// Log in and populate the session
    ///
    /// Returns the identity the server reported for the account.
    pub async fn login(&self, form: &LoginForm) -> Result<String, ClientError> {
        form.validate()?;

        let credentials = Credentials {
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        };
        let tokens = self.client.login(&credentials).await?;

        let identity = tokens
            .email
            .filter(|e| !e.is_empty())
            .unwrap_or(credentials.email);
        self.session()
            .establish(tokens.access, tokens.refresh, identity.clone());
        Ok(identity)
    }

    /// Create an account, then log straight into it
    pub async fn register(&self, form: &SignUpForm) -> Result<String, ClientError> {
        form.validate()?;

        let login = form.login_form();
        self.client
            .register(&Credentials {
                email: login.email.clone(),
                password: login.password.clone(),
            })
            .await?;
        info!(email = %login.email, "Account registered");

        self.login(&login).await
    }

    /// Forget the session locally
    pub fn logout(&self) {
        self.session().clear();
    }
}
