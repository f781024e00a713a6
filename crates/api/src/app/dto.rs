//! Request/response DTOs.
//!
//! Requests are decoded strictly: unknown fields are an error. Amounts travel
//! as decimal strings.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use ura_core::Account;
use ura_ledger::LedgerEntry;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    /// Hex SHA-512 digest of the password.
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AmountRequest {
    pub amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessPaymentRequest {
    pub transaction_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferRequest {
    pub recipient_identifier: String,
    pub amount: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AccountInfo<'a> {
    pub account: &'a Account,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

#[derive(Serialize)]
struct Envelope<T> {
    status: &'static str,
    #[serde(flatten)]
    body: T,
}

/// `200` with `{"status": "ok", ...body}`.
pub fn ok<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(Envelope { status: "ok", body })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_rejected() {
        let ok: Result<AmountRequest, _> = serde_json::from_str(r#"{"amount":"5"}"#);
        assert!(ok.is_ok());

        let extra: Result<AmountRequest, _> = serde_json::from_str(r#"{"amount":"5","memo":"x"}"#);
        assert!(extra.is_err());

        let numeric: Result<AmountRequest, _> = serde_json::from_str(r#"{"amount":5}"#);
        assert!(numeric.is_err());
    }

    #[test]
    fn envelope_flattens_the_body() {
        #[derive(Serialize)]
        struct Body {
            transaction_id: &'static str,
        }

        let value = serde_json::to_value(Envelope {
            status: "ok",
            body: Body { transaction_id: "abc" },
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"status": "ok", "transaction_id": "abc"}));

        let empty = serde_json::to_value(Envelope { status: "ok", body: Empty {} }).unwrap();
        assert_eq!(empty, serde_json::json!({"status": "ok"}));
    }
}
