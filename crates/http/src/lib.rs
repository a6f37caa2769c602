//! Contacts HTTP client
//!
//! [`ApiClient`] talks to the contacts REST API, attaching the session's
//! bearer token to every authenticated call and transparently refreshing an
//! expired access token once per request. The [`services`] module layers the
//! login flow and the paginated contact view on top of it.

#[macro_use]
extern crate tracing;

pub mod client;
pub mod services;

pub use client::{ApiClient, ApiClientBuilder, ClientError, PendingRequest};
pub use services::{AuthService, ContactBook};
