//! The one place where failures become HTTP responses.
//!
//! | Class | Status |
//! |-------|--------|
//! | malformed input | 400 |
//! | authentication (any reason) | 401 |
//! | wrong method | 405 |
//! | payment already settled | 409 |
//! | other business rule | 422 |
//! | rate limited | 429 |
//! | storage / entropy | 500 |

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use ura_auth::AuthError;
use ura_core::DomainError;
use ura_infra::{SessionError, StoreError, TransactionError};
use ura_ledger::RuleViolation;

const DENIED_MESSAGE: &str = "authentication failed";
const INTERNAL_MESSAGE: &str = "internal server error";

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "status": "error",
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn denied() -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", DENIED_MESSAGE)
}

pub fn internal(context: &'static str, err: &dyn std::error::Error) -> Response {
    error!(error = %err, context, "request failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL_MESSAGE)
}

pub fn method_not_allowed() -> Response {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed", "method not allowed")
}

pub fn rate_limited() -> Response {
    json_error(StatusCode::TOO_MANY_REQUESTS, "rate_limited", "too many requests")
}

pub fn validation(err: &DomainError) -> Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", err.reason())
}

pub fn json_rejection(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", rejection.body_text())
}

pub fn rule_violation(violation: &RuleViolation) -> Response {
    let status = match violation {
        RuleViolation::AlreadyProcessed => StatusCode::CONFLICT,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    json_error(status, violation.code(), violation.to_string())
}

pub fn auth_error(err: AuthError) -> Response {
    match err {
        AuthError::Denied | AuthError::Expired => denied(),
        AuthError::Unavailable(source) => internal("authenticate", source.as_ref()),
    }
}

pub fn session_error(err: SessionError) -> Response {
    match err {
        SessionError::Denied => denied(),
        SessionError::Store(e) => store_error("session", e),
        SessionError::Generation(e) => internal("session", &e),
    }
}

pub fn store_error(context: &'static str, err: StoreError) -> Response {
    if let StoreError::Timeout { operation } = &err {
        warn!(operation, context, "storage timeout");
    }
    internal(context, &err)
}

pub fn transaction_error(err: TransactionError) -> Response {
    match err {
        TransactionError::Validation(e) => validation(&e),
        TransactionError::Rule(v) => rule_violation(&v),
        TransactionError::Store(e) => store_error("ledger", e),
        TransactionError::Generation(e) => internal("ledger", &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_class() {
        assert_eq!(denied().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            transaction_error(TransactionError::Validation(DomainError::validation("bad"))).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            rule_violation(&RuleViolation::AlreadyProcessed).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            rule_violation(&RuleViolation::InsufficientFunds).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            auth_error(AuthError::Expired).status(),
            auth_error(AuthError::Denied).status()
        );
        assert_eq!(
            store_error("test", StoreError::Timeout { operation: "begin" }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
