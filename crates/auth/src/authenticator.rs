//! Resolve request credentials into an account.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use ura_core::{Account, AccountId, Clock, SecurityCode, SessionToken};

use crate::credentials::Credentials;
use crate::secret::secrets_match;
use crate::session::validate_session;
use crate::store::{BoxError, SessionStore};

/// Authentication outcome.
///
/// `Denied` and `Expired` must look identical to clients; they are kept apart
/// so callers can log and test the expiry path.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication denied")]
    Denied,

    #[error("session expired")]
    Expired,

    #[error("session storage unavailable: {0}")]
    Unavailable(#[source] BoxError),
}

/// Answer to a token-only session check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub account_id: AccountId,
    pub expired: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Full check: token and security code.
    ///
    /// Every failure is [`AuthError::Denied`] except a stale session, which is
    /// deleted before [`AuthError::Expired`] is returned.
    pub async fn authenticate(&self, credentials: Credentials<'_>) -> Result<Account, AuthError> {
        let token = parse_token(credentials.session_token)?;
        let code = match credentials.security_code {
            Some(raw) => SecurityCode::parse(raw).map_err(|_| deny("malformed security code"))?,
            None => return Err(deny("missing security code")),
        };

        let session = self
            .store
            .find_session(&token)
            .await
            .map_err(AuthError::Unavailable)?
            .ok_or_else(|| deny("unknown session"))?;

        if validate_session(&session, self.clock.now()).is_err() {
            self.expire(&token, session.account_id).await?;
            return Err(AuthError::Expired);
        }

        let account = self
            .store
            .find_account(session.account_id)
            .await
            .map_err(AuthError::Unavailable)?
            .ok_or_else(|| deny("session account missing"))?;

        if !secrets_match(account.security_code.as_bytes(), code.as_bytes()) {
            return Err(deny("security code mismatch"));
        }

        Ok(account)
    }

    /// Token-only check used by session validation.
    ///
    /// An expired session is deleted and reported with `expired: true`.
    pub async fn session_status(&self, session_token: Option<&str>) -> Result<SessionStatus, AuthError> {
        let token = parse_token(session_token)?;

        let session = self
            .store
            .find_session(&token)
            .await
            .map_err(AuthError::Unavailable)?
            .ok_or_else(|| deny("unknown session"))?;

        let expired = validate_session(&session, self.clock.now()).is_err();
        if expired {
            self.expire(&token, session.account_id).await?;
        }

        Ok(SessionStatus {
            account_id: session.account_id,
            expired,
            expires_at: session.expires_at,
        })
    }

    async fn expire(&self, token: &SessionToken, account_id: AccountId) -> Result<(), AuthError> {
        debug!(account_id = %account_id, "deleting expired session");
        self.store.delete_session(token).await.map_err(|e| {
            warn!(account_id = %account_id, error = %e, "failed to delete expired session");
            AuthError::Unavailable(e)
        })
    }
}

/// Presence and format check for the session token header.
pub fn parse_token(raw: Option<&str>) -> Result<SessionToken, AuthError> {
    match raw {
        Some(raw) => SessionToken::parse(raw).map_err(|_| deny("malformed session token")),
        None => Err(deny("missing session token")),
    }
}

fn deny(reason: &'static str) -> AuthError {
    debug!(reason, "authentication denied");
    AuthError::Denied
}
