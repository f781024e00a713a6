use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::HeaderMap,
    response::Response,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AccountContext;
use crate::middleware::{SESSION_TOKEN_HEADER, header};

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::LoginRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection(rejection),
    };

    match services.sessions.login(&body.username, &body.password).await {
        Ok(grant) => dto::ok(grant),
        Err(e) => errors::session_error(e),
    }
}

pub async fn logout(Extension(services): Extension<Arc<AppServices>>, headers: HeaderMap) -> Response {
    match services.sessions.logout(header(&headers, SESSION_TOKEN_HEADER)).await {
        Ok(()) => dto::ok(dto::Empty {}),
        Err(e) => errors::session_error(e),
    }
}

/// Token-only check; reports (and clears) expired sessions instead of failing.
pub async fn session(Extension(services): Extension<Arc<AppServices>>, headers: HeaderMap) -> Response {
    match services
        .authenticator
        .session_status(header(&headers, SESSION_TOKEN_HEADER))
        .await
    {
        Ok(status) => dto::ok(status),
        Err(e) => errors::auth_error(e),
    }
}

pub async fn info(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AccountContext>,
) -> Response {
    let account = ctx.account();
    match services.store.entries_for(account.id).await {
        Ok(entries) => dto::ok(dto::AccountInfo { account, entries }),
        Err(e) => errors::store_error("info", e),
    }
}
