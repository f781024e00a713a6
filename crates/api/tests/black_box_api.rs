use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{Value, json};

use ura_api::app::{AppServices, build_app};
use ura_core::{Amount, SystemClock};
use ura_infra::{Config, NewAccount, RateLimitConfig, db};

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod over a fresh in-memory database; no request spacing.
    async fn spawn() -> Self {
        Self::spawn_with_window(Duration::ZERO).await
    }

    async fn spawn_with_window(window: Duration) -> Self {
        let config = Config {
            rate_limit: RateLimitConfig {
                window,
                ..RateLimitConfig::default()
            },
            ..Config::default()
        };

        let pool = db::connect_in_memory().await.expect("failed to open database");
        let services = Arc::new(AppServices::new(pool, &config, Arc::new(SystemClock)));
        let app = build_app(services.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn seed(&self, username: &str, balance: Amount) {
        let new = NewAccount::generate(
            username,
            format!("{username}@example.com"),
            digest_of(username),
            balance,
        )
        .unwrap();
        self.services
            .store
            .create_account(new, chrono::Utc::now())
            .await
            .unwrap();
    }

    /// Log in and return `(session_token, security_code)`.
    async fn login(&self, client: &reqwest::Client, username: &str) -> (String, String) {
        let res = client
            .post(self.url("/api/user/login"))
            .json(&json!({"username": username, "password": digest_of(username)}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        (
            body["session_token"].as_str().unwrap().to_string(),
            body["security_code"].as_str().unwrap().to_string(),
        )
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Stand-in for the client-side password hash: any 128 lowercase hex chars.
fn digest_of(username: &str) -> String {
    let byte = username.len() as u8;
    format!("{byte:02x}").repeat(64)
}

async fn post_authed(
    client: &reqwest::Client,
    url: String,
    creds: &(String, String),
    body: Value,
) -> reqwest::Response {
    client
        .post(url)
        .header("x-session-token", &creds.0)
        .header("x-security-code", &creds.1)
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_method_is_405_before_authentication() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client.get(srv.url("/api/payment/send")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"], "method_not_allowed");
}

#[tokio::test]
async fn auth_failures_are_generic() {
    let srv = TestServer::spawn().await;
    srv.seed("alice.smith", Amount::ZERO).await;

    let client = reqwest::Client::new();
    let (token, _) = srv.login(&client, "alice.smith").await;

    let missing = client
        .post(srv.url("/api/user/info"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let missing: Value = missing.json().await.unwrap();

    let wrong_code = post_authed(
        &client,
        srv.url("/api/user/info"),
        &(token, "ab".repeat(16)),
        json!({}),
    )
    .await;
    assert_eq!(wrong_code.status(), StatusCode::UNAUTHORIZED);
    let wrong_code: Value = wrong_code.json().await.unwrap();

    assert_eq!(missing, wrong_code);
}

#[tokio::test]
async fn login_rejects_bad_passwords() {
    let srv = TestServer::spawn().await;
    srv.seed("alice.smith", Amount::ZERO).await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/api/user/login"))
        .json(&json!({"username": "alice.smith", "password": "00".repeat(64)}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn request_then_send_moves_money_once() {
    let srv = TestServer::spawn().await;
    srv.seed("alice.smith", Amount::ZERO).await;
    srv.seed("bob.jones", Amount::whole(1000)).await;

    let client = reqwest::Client::new();
    let alice = srv.login(&client, "alice.smith").await;
    let bob = srv.login(&client, "bob.jones").await;

    let res = post_authed(
        &client,
        srv.url("/api/payment/request"),
        &alice,
        json!({"amount": "500"}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["amount"], "500.00");
    let transaction_id = body["transaction_id"].as_str().unwrap().to_string();
    assert_eq!(transaction_id.len(), 64);

    let res = post_authed(
        &client,
        srv.url("/api/payment/send"),
        &bob,
        json!({"transaction_id": transaction_id}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let again = post_authed(
        &client,
        srv.url("/api/payment/send"),
        &bob,
        json!({"transaction_id": transaction_id}),
    )
    .await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    let again: Value = again.json().await.unwrap();
    assert_eq!(again["error"], "already_processed");

    let info: Value = post_authed(&client, srv.url("/api/user/info"), &alice, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(info["account"]["balance"], "500.00");

    let info: Value = post_authed(&client, srv.url("/api/user/info"), &bob, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(info["account"]["balance"], "500.00");
}

#[tokio::test]
async fn withdraw_cap_is_exclusive() {
    let srv = TestServer::spawn().await;
    srv.seed("carol.white", Amount::whole(100_000)).await;

    let client = reqwest::Client::new();
    let carol = srv.login(&client, "carol.white").await;

    let at_cap = post_authed(
        &client,
        srv.url("/api/withdraw"),
        &carol,
        json!({"amount": "50000"}),
    )
    .await;
    assert_eq!(at_cap.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let at_cap: Value = at_cap.json().await.unwrap();
    assert_eq!(at_cap["error"], "withdraw_cap_exceeded");

    let below = post_authed(
        &client,
        srv.url("/api/withdraw"),
        &carol,
        json!({"amount": "49999.99"}),
    )
    .await;
    assert_eq!(below.status(), StatusCode::OK);

    let info: Value = post_authed(&client, srv.url("/api/user/info"), &carol, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(info["account"]["balance"], "50000.01");
}

#[tokio::test]
async fn malformed_amounts_and_unknown_fields_are_400() {
    let srv = TestServer::spawn().await;
    srv.seed("alice.smith", Amount::ZERO).await;

    let client = reqwest::Client::new();
    let alice = srv.login(&client, "alice.smith").await;

    let extra = post_authed(
        &client,
        srv.url("/api/payment/request"),
        &alice,
        json!({"amount": "5", "memo": "lunch"}),
    )
    .await;
    assert_eq!(extra.status(), StatusCode::BAD_REQUEST);

    let malformed = post_authed(
        &client,
        srv.url("/api/payment/request"),
        &alice,
        json!({"amount": "1.234"}),
    )
    .await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    let malformed: Value = malformed.json().await.unwrap();
    assert_eq!(malformed["error"], "validation_error");
}

#[tokio::test]
async fn session_check_and_logout() {
    let srv = TestServer::spawn().await;
    srv.seed("alice.smith", Amount::ZERO).await;

    let client = reqwest::Client::new();
    let (token, code) = srv.login(&client, "alice.smith").await;

    let res = client
        .post(srv.url("/api/user/session"))
        .header("x-session-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["expired"], false);

    let res = client
        .post(srv.url("/api/user/logout"))
        .header("x-session-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/api/user/session"))
        .header("x-session-token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = post_authed(&client, srv.url("/api/user/info"), &(token, code), json!({})).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn info_never_exposes_the_security_code() {
    let srv = TestServer::spawn().await;
    srv.seed("alice.smith", Amount::whole(25)).await;

    let client = reqwest::Client::new();
    let alice = srv.login(&client, "alice.smith").await;

    let res = post_authed(&client, srv.url("/api/user/info"), &alice, json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);

    let text = res.text().await.unwrap();
    assert!(!text.contains(&alice.1));

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["account"]["username"], "alice.smith");
    assert_eq!(body["account"]["balance"], "25.00");
    assert!(body["account"].get("security_code").is_none());
    assert!(body["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn limiter_spaces_requests_per_client() {
    let srv = TestServer::spawn_with_window(Duration::from_secs(2)).await;
    srv.seed("alice.smith", Amount::ZERO).await;

    let client = reqwest::Client::new();
    srv.login(&client, "alice.smith").await;

    let res = client
        .post(srv.url("/api/user/login"))
        .json(&json!({"username": "alice.smith", "password": digest_of("alice.smith")}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "rate_limited");

    let res = client
        .post(srv.url("/api/user/login"))
        .header("x-forwarded-for", "203.0.113.9")
        .json(&json!({"username": "alice.smith", "password": digest_of("alice.smith")}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Token-only session checks are not spaced.
    let res = client.post(srv.url("/api/user/session")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn limiter_runs_before_authentication() {
    let srv = TestServer::spawn_with_window(Duration::from_secs(2)).await;

    let client = reqwest::Client::new();
    let first = client
        .post(srv.url("/api/withdraw"))
        .json(&json!({"amount": "10"}))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
    let first: Value = first.json().await.unwrap();
    assert_eq!(first["error"], "unauthorized");

    let second = client
        .post(srv.url("/api/withdraw"))
        .json(&json!({"amount": "10"}))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let second: Value = second.json().await.unwrap();
    assert_eq!(second["error"], "rate_limited");
    assert_ne!(second, first);
}
