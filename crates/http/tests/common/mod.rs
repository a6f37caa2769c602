//! Shared helpers for client integration tests

#![allow(dead_code)]

use contacts_core::{MemoryStorage, SessionStore};
use contacts_http::ApiClient;
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

pub const EMAIL: &str = "user@example.com";

/// Route client logs to the test harness output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("contacts_http=debug")
        .with_test_writer()
        .try_init();
}

/// Client against `server` whose session holds the given tokens
///
/// Empty strings leave the corresponding token unset.
pub fn client_with_tokens(
    server: &MockServer,
    access: &str,
    refresh: &str,
) -> (ApiClient, Arc<MemoryStorage>) {
    init_tracing();
    let storage = Arc::new(MemoryStorage::new());
    let session = Arc::new(SessionStore::new(storage.clone()));
    if !access.is_empty() || !refresh.is_empty() {
        session.establish(access, refresh, EMAIL);
    }
    let client = ApiClient::new(server.uri(), session).unwrap();
    (client, storage)
}

pub fn contact_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "address_line_1": null,
        "address_line_2": null,
        "city": null,
        "country": null,
        "postcode": null,
        "telephones": [{"number": format!("012345678{id}")}]
    })
}

pub fn page_json(contacts: Vec<Value>) -> Value {
    json!({
        "count": contacts.len(),
        "next": null,
        "previous": null,
        "results": contacts
    })
}
