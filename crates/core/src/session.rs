//! Client-side session state
//!
//! A [`SessionStore`] is the single owner of the current credentials. It is
//! shared by handle (`Arc<SessionStore>`) with the API client, which reads the
//! access token for every outbound call and writes through the controlled
//! mutation methods below. Observers (the UI layer) follow changes through
//! [`SessionStore::watch`] or the [`SessionEvent`] stream instead of being
//! driven directly.

use crate::storage::{SessionStorage, keys};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 16;

/// Current authentication state
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub identity: String,
    pub is_authenticated: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("Session")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("identity", &self.identity)
            .field("is_authenticated", &self.is_authenticated)
            .finish()
    }
}

/// Why a session was torn down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The user logged out
    Logout,
    /// No refresh token was available when one was needed
    MissingRefreshToken,
    /// The refresh endpoint answered 401
    RefreshRejected,
    /// The refresh call failed for any other reason
    RefreshFailed(String),
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logout => write!(f, "logged out"),
            Self::MissingRefreshToken => write!(f, "no refresh token available"),
            Self::RefreshRejected => write!(f, "refresh token rejected"),
            Self::RefreshFailed(reason) => write!(f, "token refresh failed: {reason}"),
        }
    }
}

/// Session lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn { identity: String },
    Refreshed,
    Terminated { reason: TerminationReason },
}

/// Owner of the session and its persisted copy
pub struct SessionStore {
    state: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Create a logged-out store without reading `storage`
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self::with_session(storage, Session::default())
    }

    /// Create a store seeded from the values persisted in `storage`
    ///
    /// The session counts as authenticated when an access token was found.
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let read = |key: &str| match storage.get(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(key, error = %e, "Failed to read persisted session value");
                String::new()
            }
        };

        let access_token = read(keys::ACCESS);
        let session = Session {
            is_authenticated: !access_token.is_empty(),
            access_token,
            refresh_token: read(keys::REFRESH),
            identity: read(keys::EMAIL),
        };
        debug!(authenticated = session.is_authenticated, "Restored session");

        Self::with_session(storage, session)
    }

    fn with_session(storage: Arc<dyn SessionStorage>, session: Session) -> Self {
        let (state, _) = watch::channel(session);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state,
            events,
            storage,
        }
    }

    /// Copy of the current session
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Current access token, if any
    pub fn access_token(&self) -> Option<String> {
        non_empty(&self.state.borrow().access_token)
    }

    /// Current refresh token, if any
    pub fn refresh_token(&self) -> Option<String> {
        non_empty(&self.state.borrow().refresh_token)
    }

    /// Identity (email) of the logged-in user, if any
    pub fn identity(&self) -> Option<String> {
        non_empty(&self.state.borrow().identity)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Follow session changes
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Receive lifecycle events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Record a fresh login
    pub fn establish(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        identity: impl Into<String>,
    ) {
        let session = Session {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            identity: identity.into(),
            is_authenticated: true,
        };
        self.persist(keys::ACCESS, &session.access_token);
        self.persist(keys::REFRESH, &session.refresh_token);
        self.persist(keys::EMAIL, &session.identity);

        let identity = session.identity.clone();
        self.state.send_replace(session);
        info!(%identity, "Session established");
        self.emit(SessionEvent::LoggedIn { identity });
    }

    /// Replace the access token after a successful refresh
    ///
    /// The refresh token and identity are kept unless the backend rotated the
    /// refresh token, in which case the new one replaces it.
    pub fn apply_refreshed_token(&self, access_token: &str, rotated_refresh: Option<&str>) {
        self.persist(keys::ACCESS, access_token);
        if let Some(refresh) = rotated_refresh {
            self.persist(keys::REFRESH, refresh);
        }

        self.state.send_modify(|session| {
            session.access_token = access_token.to_string();
            if let Some(refresh) = rotated_refresh {
                session.refresh_token = refresh.to_string();
            }
            session.is_authenticated = true;
        });
        debug!(rotated = rotated_refresh.is_some(), "Access token refreshed");
        self.emit(SessionEvent::Refreshed);
    }

    /// Log out
    pub fn clear(&self) {
        self.terminate(TerminationReason::Logout);
    }

    /// Tear the session down, wiping the persisted copy
    pub fn terminate(&self, reason: TerminationReason) {
        for key in keys::ALL {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to remove persisted session value");
            }
        }
        self.state.send_replace(Session::default());

        match reason {
            TerminationReason::Logout => info!("Session cleared"),
            ref other => warn!(reason = %other, "Session terminated"),
        }
        self.emit(SessionEvent::Terminated { reason });
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            warn!(key, error = %e, "Failed to persist session value");
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
