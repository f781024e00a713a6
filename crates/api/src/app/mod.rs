//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage, authenticator, processor and limiter wiring
//! - `routes/`: HTTP handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{MethodRouter, get, post},
};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// rate limiter can fall back to the peer address.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let limited = from_fn_with_state(services.clone(), middleware::rate_limit);
    let authenticated = from_fn_with_state(services.clone(), middleware::require_account);

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/api/user/login", post_only(post(routes::user::login).route_layer(limited.clone())))
        .route("/api/user/logout", post_only(post(routes::user::logout).route_layer(limited.clone())))
        .route("/api/user/session", post_only(post(routes::user::session)))
        .route(
            "/api/user/info",
            post_only(post(routes::user::info).route_layer(authenticated.clone())),
        )
        .route(
            "/api/payment/request",
            post_only(
                post(routes::payment::request)
                    .route_layer(authenticated.clone())
                    .route_layer(limited.clone()),
            ),
        )
        .route(
            "/api/payment/send",
            post_only(
                post(routes::payment::send)
                    .route_layer(authenticated.clone())
                    .route_layer(limited.clone()),
            ),
        )
        .route(
            "/api/payment/transfer",
            post_only(
                post(routes::payment::transfer)
                    .route_layer(authenticated.clone())
                    .route_layer(limited.clone()),
            ),
        )
        .route(
            "/api/withdraw",
            post_only(
                post(routes::wallet::withdraw)
                    .route_layer(authenticated.clone())
                    .route_layer(limited.clone()),
            ),
        )
        .route(
            "/api/cashin",
            post_only(
                post(routes::wallet::cash_in)
                    .route_layer(authenticated.clone())
                    .route_layer(limited.clone()),
            ),
        )
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(middleware::request_log))
                .layer(Extension(services)),
        )
}

/// Every other method gets a JSON 405 without touching the route layers.
fn post_only(route: MethodRouter) -> MethodRouter {
    route.fallback(method_not_allowed)
}

async fn method_not_allowed() -> axum::response::Response {
    errors::method_not_allowed()
}
