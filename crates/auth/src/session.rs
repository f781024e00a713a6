use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use ura_core::{AccountId, GenerationError, SessionToken};

/// A login session (transport-agnostic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    pub token: SessionToken,
    pub account_id: AccountId,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Issue a fresh session for `account_id` expiring `ttl` after `now`.
    pub fn issue(account_id: AccountId, now: DateTime<Utc>, ttl: Duration) -> Result<Self, GenerationError> {
        Ok(Self {
            token: SessionToken::generate()?,
            account_id,
            expires_at: now + ttl,
        })
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        validate_session(self, now).is_err()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionValidationError {
    #[error("session has expired")]
    Expired,
}

/// Deterministically check a session against `now`.
///
/// A session is valid strictly before `expires_at`.
pub fn validate_session(session: &Session, now: DateTime<Utc>) -> Result<(), SessionValidationError> {
    if now >= session.expires_at {
        return Err(SessionValidationError::Expired);
    }
    Ok(())
}
