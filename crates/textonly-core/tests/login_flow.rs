//! Device-authorization login and logout against a mocked authorization server.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use textonly_core::auth::{self, AuthError, CredentialStore, FileBackend, LoginFlow, SecretBackend};
use textonly_core::{ApiClient, ApiError};

fn start_body(interval: i64, expires_in: i64) -> serde_json::Value {
    json!({
        "device_code": "D1",
        "user_code": "ABCD-1234",
        "verification_uri": "https://example/verify",
        "interval": interval,
        "expires_in": expires_in
    })
}

async fn mount_start(server: &MockServer, interval: i64, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path("/cli/login/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(start_body(interval, expires_in)))
        .expect(1)
        .mount(server)
        .await;
}

fn file_store(dir: &tempfile::TempDir) -> (CredentialStore, PathBuf) {
    let token_path = dir.path().join("textonly").join("token");
    let store = CredentialStore::with_backends(vec![Box::new(FileBackend::new(&token_path))]);
    (store, token_path)
}

/// Native store holding an earlier token that no longer accepts writes.
struct LockedKeychain {
    token: Mutex<Option<String>>,
}

impl SecretBackend for LockedKeychain {
    fn name(&self) -> &str {
        "locked-keychain"
    }

    fn save(&self, _token: &str) -> Result<(), AuthError> {
        Err(AuthError::NotAuthenticated)
    }

    fn load(&self) -> Result<Option<String>, AuthError> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

async fn mount_token_poll(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/cli/login/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": token})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_succeeds_after_pending_polls() {
    let server = MockServer::start().await;
    mount_start(&server, 1, 5).await;

    // First two polls are pending, the third carries the token
    Mock::given(method("POST"))
        .and(path("/cli/login/poll"))
        .and(body_json(json!({"device_code": "D1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/cli/login/poll"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "authorized", "access_token": "tok_abc"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, token_path) = file_store(&dir);
    let client = ApiClient::new(&server.uri()).unwrap();

    let mut shown = None;
    let started = Instant::now();
    LoginFlow::new(&client, &store)
        .open_browser(false)
        .run(|session| {
            shown = Some((session.user_code.clone(), session.verification_uri.clone()));
        })
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(
        shown,
        Some(("ABCD-1234".to_string(), "https://example/verify".to_string()))
    );
    assert_eq!(store.load().unwrap(), "tok_abc");
    assert!(token_path.exists());
    // Two jittered one-second waits, never beyond the five-second lifetime
    assert!(elapsed >= Duration::from_millis(1500), "waited only {:?}", elapsed);
    assert!(elapsed <= Duration::from_secs(5), "waited {:?}", elapsed);
}

#[tokio::test]
async fn test_login_times_out_without_saving() {
    let server = MockServer::start().await;
    mount_start(&server, 1, 2).await;
    Mock::given(method("POST"))
        .and(path("/cli/login/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "pending"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, token_path) = file_store(&dir);
    let client = ApiClient::new(&server.uri()).unwrap();

    let started = Instant::now();
    let result = LoginFlow::new(&client, &store)
        .open_browser(false)
        .run(|_| {})
        .await;

    assert!(matches!(result, Err(AuthError::LoginTimedOut)));
    assert!(!token_path.exists(), "nothing may be stored on timeout");
    assert!(started.elapsed() >= Duration::from_millis(1900));
    assert!(started.elapsed() < Duration::from_secs(4));
}

// Poll failures are indistinguishable from "pending": a persistently failing
// poll endpoint ends in a timeout rather than an early network error.
#[tokio::test]
async fn test_login_poll_errors_degrade_to_timeout() {
    let server = MockServer::start().await;
    mount_start(&server, 1, 2).await;
    Mock::given(method("POST"))
        .and(path("/cli/login/poll"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, _) = file_store(&dir);
    let client = ApiClient::new(&server.uri()).unwrap();

    let result = LoginFlow::new(&client, &store)
        .open_browser(false)
        .run(|_| {})
        .await;
    assert!(matches!(result, Err(AuthError::LoginTimedOut)));

    let polls = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/cli/login/poll")
        .count();
    assert!(polls >= 2, "polling should keep retrying, saw {}", polls);
}

#[tokio::test]
async fn test_login_start_failure_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cli/login/start"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, _) = file_store(&dir);
    let client = ApiClient::new(&server.uri()).unwrap();

    let mut notified = false;
    let result = LoginFlow::new(&client, &store)
        .open_browser(false)
        .run(|_| notified = true)
        .await;

    assert!(matches!(
        result,
        Err(AuthError::Api(ApiError::ServerError { status: 503, .. }))
    ));
    assert!(!notified);
}

#[tokio::test]
async fn test_login_fails_when_token_cannot_be_stored() {
    let server = MockServer::start().await;
    mount_start(&server, 1, 5).await;
    Mock::given(method("POST"))
        .and(path("/cli/login/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok_abc"})))
        .mount(&server)
        .await;

    // The token path sits under a regular file, so it can never be created
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let store = CredentialStore::with_backends(vec![Box::new(FileBackend::new(blocker.join("token")))]);
    let client = ApiClient::new(&server.uri()).unwrap();

    let result = LoginFlow::new(&client, &store)
        .open_browser(false)
        .run(|_| {})
        .await;
    assert!(matches!(result, Err(AuthError::Storage { .. })));
}

#[tokio::test]
async fn test_login_falls_back_to_file_and_replaces_stale_token() {
    let server = MockServer::start().await;
    mount_start(&server, 1, 5).await;
    mount_token_poll(&server, "tok_new").await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("textonly").join("token");
    let store = CredentialStore::with_backends(vec![
        Box::new(LockedKeychain {
            token: Mutex::new(Some("tok_old".to_string())),
        }),
        Box::new(FileBackend::new(&token_path)),
    ]);
    assert_eq!(store.load().unwrap(), "tok_old");
    let client = ApiClient::new(&server.uri()).unwrap();

    LoginFlow::new(&client, &store)
        .open_browser(false)
        .run(|_| {})
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&token_path).unwrap(), "tok_new");
    assert_eq!(store.load().unwrap(), "tok_new");
}

#[tokio::test]
async fn test_login_survives_browser_failure() {
    let server = MockServer::start().await;
    mount_start(&server, 1, 5).await;
    mount_token_poll(&server, "tok_abc").await;

    let dir = tempfile::tempdir().unwrap();
    let (store, _) = file_store(&dir);
    let client = ApiClient::new(&server.uri()).unwrap();

    let opened = Arc::new(Mutex::new(Vec::new()));
    let seen = opened.clone();
    LoginFlow::new(&client, &store)
        .open_browser(true)
        .with_opener(move |url: &str| {
            seen.lock().unwrap().push(url.to_string());
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no browser"))
        })
        .run(|_| {})
        .await
        .unwrap();

    assert_eq!(*opened.lock().unwrap(), vec!["https://example/verify".to_string()]);
    assert_eq!(store.load().unwrap(), "tok_abc");
}

#[tokio::test]
async fn test_login_no_open_skips_browser() {
    let server = MockServer::start().await;
    mount_start(&server, 1, 5).await;
    mount_token_poll(&server, "tok_abc").await;

    let dir = tempfile::tempdir().unwrap();
    let (store, _) = file_store(&dir);
    let client = ApiClient::new(&server.uri()).unwrap();

    let opened = Arc::new(Mutex::new(0));
    let count = opened.clone();
    LoginFlow::new(&client, &store)
        .open_browser(false)
        .with_opener(move |_: &str| {
            *count.lock().unwrap() += 1;
            Ok(())
        })
        .run(|_| {})
        .await
        .unwrap();

    assert_eq!(*opened.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_logout_revokes_and_clears() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("authorization", "Bearer tok_abc"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, token_path) = file_store(&dir);
    let store = Arc::new(store);
    store.save("tok_abc").unwrap();

    let provider_store = store.clone();
    let client = ApiClient::new(&server.uri())
        .unwrap()
        .with_env_lookup(|_: &str| None)
        .with_token_provider(move || provider_store.load().map_err(anyhow::Error::from));

    auth::logout(&client, &store).await.unwrap();
    assert!(!token_path.exists());
    assert!(matches!(store.load(), Err(AuthError::NotAuthenticated)));
}

#[tokio::test]
async fn test_logout_clears_even_when_revoke_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, _) = file_store(&dir);
    store.save("tok_abc").unwrap();
    let client = ApiClient::new(&server.uri()).unwrap();

    auth::logout(&client, &store).await.unwrap();
    assert!(matches!(store.load(), Err(AuthError::NotAuthenticated)));
}

#[tokio::test]
async fn test_logout_without_token_skips_revoke() {
    let server = MockServer::start().await;
    Mock::given(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (store, _) = file_store(&dir);
    let client = ApiClient::new(&server.uri()).unwrap();

    auth::logout(&client, &store).await.unwrap();
}

#[tokio::test]
async fn test_whoami_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer tok_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"email": "a@b.com"})))
        .mount(&server)
        .await;

    let client = ApiClient::new(&server.uri())
        .unwrap()
        .with_env_lookup(|_: &str| None)
        .with_token_provider(|| -> anyhow::Result<String> { Ok("tok_abc".to_string()) });

    let me = auth::whoami(&client).await.unwrap();
    assert_eq!(auth::identity_summary(&me), "a@b.com");
}
