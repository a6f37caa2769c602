//! Token refresh behaviour of the unauthorized-response interceptor

mod common;

use common::{EMAIL, client_with_tokens, init_tracing, page_json};
use contacts_core::storage::{SessionStorage, keys};
use contacts_core::{MemoryStorage, SessionEvent, SessionStore, TerminationReason};
use contacts_http::{ApiClient, ClientError};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_contacts(server: &MockServer, token: &str, status: u16, times: u64) {
    let template = if status == 200 {
        ResponseTemplate::new(200).set_body_json(page_json(vec![]))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path("/contacts"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(template)
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_refresh(server: &MockServer, template: ResponseTemplate, times: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(template)
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 1).await;
    mount_contacts(&server, "T2", 200, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "T2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, storage) = client_with_tokens(&server, "T1", "R1");

    let page = client.list_contacts(1, 10).await.unwrap();
    assert_eq!(page.count, 0);

    let session = client.session().snapshot();
    assert_eq!(session.access_token, "T2");
    assert_eq!(session.refresh_token, "R1");
    assert_eq!(session.identity, EMAIL);
    assert!(session.is_authenticated);
    assert_eq!(storage.get(keys::ACCESS).unwrap().as_deref(), Some("T2"));
    assert_eq!(storage.get(keys::REFRESH).unwrap().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_rotated_refresh_token_is_adopted() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 1).await;
    mount_contacts(&server, "T2", 200, 1).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"access": "T2", "refresh": "R2"})),
        1,
    )
    .await;

    let (client, storage) = client_with_tokens(&server, "T1", "R1");

    client.list_contacts(1, 10).await.unwrap();
    assert_eq!(client.session().refresh_token().as_deref(), Some("R2"));
    assert_eq!(storage.get(keys::REFRESH).unwrap().as_deref(), Some("R2"));
}

#[tokio::test]
async fn test_second_rejection_is_returned_without_another_refresh() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 1).await;
    mount_contacts(&server, "T2", 401, 1).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"access": "T2"})),
        1,
    )
    .await;

    let (client, _) = client_with_tokens(&server, "T1", "R1");

    let err = client.list_contacts(1, 10).await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
    assert_eq!(err.status(), Some(401));

    // The refreshed session is kept
    assert!(client.session().is_authenticated());
    assert_eq!(client.session().access_token().as_deref(), Some("T2"));
}

#[tokio::test]
async fn test_rejected_refresh_ends_session() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 1).await;
    mount_refresh(&server, ResponseTemplate::new(401), 1).await;

    let (client, storage) = client_with_tokens(&server, "T1", "R1");
    let mut events = client.session().subscribe();

    let err = client.list_contacts(1, 10).await.unwrap_err();
    assert!(err.is_session_expired());

    let session = client.session().snapshot();
    assert!(!session.is_authenticated);
    assert!(session.access_token.is_empty());
    assert!(session.refresh_token.is_empty());
    assert!(session.identity.is_empty());
    assert!(storage.is_empty());

    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::Terminated {
            reason: TerminationReason::RefreshRejected
        }
    );
}

#[tokio::test]
async fn test_refresh_server_error_ends_session() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 1).await;
    mount_refresh(&server, ResponseTemplate::new(500), 1).await;

    let (client, storage) = client_with_tokens(&server, "T1", "R1");

    let err = client.list_contacts(1, 10).await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(!client.session().is_authenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_refresh_without_access_token_ends_session() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 1).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"detail": "ok"})),
        1,
    )
    .await;

    let (client, storage) = client_with_tokens(&server, "T1", "R1");

    let err = client.list_contacts(1, 10).await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_missing_refresh_token_skips_refresh_call() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 1).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"access": "T2"})),
        0,
    )
    .await;

    let (client, storage) = client_with_tokens(&server, "T1", "");
    let mut watch = client.session().watch();

    let err = client.list_contacts(1, 10).await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(storage.is_empty());
    assert!(watch.has_changed().unwrap());
    assert!(!watch.borrow_and_update().is_authenticated);
}

#[tokio::test]
async fn test_unauthorized_refresh_call_ends_session() {
    let server = MockServer::start().await;
    mount_refresh(&server, ResponseTemplate::new(401), 1).await;

    let (client, storage) = client_with_tokens(&server, "T1", "R1");

    let request = client
        .post("/auth/refresh")
        .public()
        .json(&json!({"refresh": "R1"}));
    let err = client.execute_empty(request).await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(!client.session().is_authenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_concurrent_rejections_share_one_refresh() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 2).await;
    mount_contacts(&server, "T2", 200, 2).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"access": "T2"})),
        1,
    )
    .await;

    let (client, _) = client_with_tokens(&server, "T1", "R1");

    let (first, second) = tokio::join!(client.list_contacts(1, 10), client.list_contacts(1, 10));
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(client.session().access_token().as_deref(), Some("T2"));
}

#[tokio::test]
async fn test_explicit_refresh_updates_session() {
    let server = MockServer::start().await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"access": "T9"})),
        1,
    )
    .await;

    let (client, _) = client_with_tokens(&server, "T1", "R1");
    let mut events = client.session().subscribe();

    let token = client.refresh_access_token().await.unwrap();
    assert_eq!(token, "T9");
    assert_eq!(client.session().access_token().as_deref(), Some("T9"));
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Refreshed);
}

#[tokio::test]
async fn test_public_request_rejection_is_not_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "No active account found"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"access": "T2"})),
        0,
    )
    .await;

    let (client, _) = client_with_tokens(&server, "T1", "R1");

    let request = client
        .post("/auth/login")
        .public()
        .json(&json!({"email": EMAIL, "password": "wrong"}));
    let err = client.execute_empty(request).await.unwrap_err();

    assert!(matches!(err, ClientError::Unauthorized(ref m) if m == "No active account found"));
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn test_refresh_transport_error_ends_session() {
    init_tracing();
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 1).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"access": "T2"}))
            .set_delay(Duration::from_secs(3)),
        1,
    )
    .await;

    let storage = Arc::new(MemoryStorage::new());
    let session = Arc::new(SessionStore::new(storage.clone()));
    session.establish("T1", "R1", EMAIL);
    let client = ApiClient::builder()
        .base_url(server.uri())
        .session(session)
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let mut events = client.session().subscribe();

    let err = client.list_contacts(1, 10).await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(!client.session().is_authenticated());
    assert!(storage.is_empty());
    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Terminated {
            reason: TerminationReason::RefreshFailed(_)
        }
    ));
}

#[tokio::test]
async fn test_refresh_with_unparseable_body_ends_session() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 1).await;
    mount_refresh(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>gateway</html>"),
        1,
    )
    .await;

    let (client, storage) = client_with_tokens(&server, "T1", "R1");

    let err = client.list_contacts(1, 10).await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(!client.session().is_authenticated());
    assert!(storage.is_empty());
}

#[tokio::test]
async fn test_concurrent_rejections_end_session_once() {
    let server = MockServer::start().await;
    mount_contacts(&server, "T1", 401, 2).await;
    mount_refresh(&server, ResponseTemplate::new(401), 1).await;

    let (client, storage) = client_with_tokens(&server, "T1", "R1");
    let mut events = client.session().subscribe();

    let (first, second) = tokio::join!(client.list_contacts(1, 10), client.list_contacts(1, 10));
    assert!(first.unwrap_err().is_session_expired());
    assert!(second.unwrap_err().is_session_expired());
    assert!(storage.is_empty());

    let mut terminations = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Terminated { reason } = event {
            terminations.push(reason);
        }
    }
    assert_eq!(terminations, vec![TerminationReason::RefreshRejected]);
}
