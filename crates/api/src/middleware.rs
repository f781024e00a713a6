use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use ura_auth::Credentials;
use ura_infra::client_key;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::AccountContext;

pub const SESSION_TOKEN_HEADER: &str = "x-session-token";
pub const SECURITY_CODE_HEADER: &str = "x-security-code";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// One log line per request, inside a span keyed by a time-ordered request id.
pub async fn request_log(req: Request, next: Next) -> Response {
    let request_id = Uuid::now_v7();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let peer = peer_addr(&req).map(|addr| addr.ip().to_string()).unwrap_or_default();

    let span = info_span!("http_request", %request_id, %method, %path, %peer);
    let started = Instant::now();

    let mut response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Reject a request when its client was admitted too recently.
pub async fn rate_limit(State(services): State<Arc<AppServices>>, req: Request, next: Next) -> Response {
    let forwarded = header(req.headers(), "x-forwarded-for");
    let peer = peer_addr(&req).map(|addr| addr.ip());
    let key = client_key(forwarded, peer, services.trust_forwarded_for);

    if !services.limiter.admit(&key) {
        debug!(client = %key, "rate limited");
        return errors::rate_limited();
    }

    next.run(req).await
}

/// Full authentication (session token + security code).
///
/// On success the resolved account is attached as [`AccountContext`].
pub async fn require_account(
    State(services): State<Arc<AppServices>>,
    mut req: Request,
    next: Next,
) -> Response {
    let credentials = Credentials::new(
        header(req.headers(), SESSION_TOKEN_HEADER),
        header(req.headers(), SECURITY_CODE_HEADER),
    );

    let account = match services.authenticator.authenticate(credentials).await {
        Ok(account) => account,
        Err(e) => return errors::auth_error(e),
    };

    req.extensions_mut().insert(AccountContext::new(account));
    next.run(req).await
}

pub fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn peer_addr(req: &Request) -> Option<SocketAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}
