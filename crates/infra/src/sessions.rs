//! Login and logout.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use ura_auth::{Session, parse_token, secrets_match};
use ura_core::{AccountId, Clock, GenerationError, SecurityCode, SessionToken, validate};

use crate::store::{SqliteStore, StoreError};

/// Compared against when the username is unknown, so both paths do the same work.
const PLACEHOLDER_DIGEST: &str = "00000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad username, bad password, malformed input: all the same to the client.
    #[error("authentication denied")]
    Denied,

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("identifier generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Credentials handed back after a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginGrant {
    pub account_id: AccountId,
    pub session_token: SessionToken,
    pub security_code: SecurityCode,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionService {
    store: SqliteStore,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(store: SqliteStore, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Check `username` / `password` (a hex SHA-512 digest) and open a session.
    #[instrument(skip(self, password), err)]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, SessionError> {
        if !validate::is_username(username) || !validate::is_digest(password) {
            debug!("login rejected: malformed credentials");
            return Err(SessionError::Denied);
        }

        let record = self.store.login_record(username).await?;
        let stored = record.as_ref().map_or(PLACEHOLDER_DIGEST, |(_, digest)| digest.as_str());
        let matches = secrets_match(stored.as_bytes(), password.as_bytes());

        let account = match record {
            Some((account, _)) if matches => account,
            _ => {
                debug!("login rejected: unknown user or wrong password");
                return Err(SessionError::Denied);
            }
        };

        let session = Session::issue(account.id, self.clock.now(), self.ttl)?;
        self.store.insert_session(&session).await?;

        info!(account_id = %account.id, "session opened");
        Ok(LoginGrant {
            account_id: account.id,
            session_token: session.token,
            security_code: account.security_code,
            expires_at: session.expires_at,
        })
    }

    /// Drop the session behind `session_token`. Unknown tokens are fine.
    #[instrument(skip(self, session_token), err)]
    pub async fn logout(&self, session_token: Option<&str>) -> Result<(), SessionError> {
        let token = parse_token(session_token).map_err(|_| SessionError::Denied)?;
        self.store.remove_session(&token).await?;
        info!("session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use ura_auth::{AuthError, Authenticator, Credentials};
    use ura_core::{Amount, ManualClock};

    use super::*;
    use crate::db;
    use crate::store::NewAccount;

    fn password() -> String {
        "9f".repeat(64)
    }

    async fn setup() -> (SessionService, Authenticator, SqliteStore, Arc<ManualClock>) {
        let pool = db::connect_in_memory().await.unwrap();
        let store = SqliteStore::new(pool, StdDuration::from_secs(5));
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let new = NewAccount::generate("alice.smith", "alice@example.com", password(), Amount::ZERO).unwrap();
        store.create_account(new, clock.now()).await.unwrap();

        let sessions = SessionService::new(store.clone(), clock.clone(), Duration::minutes(60));
        let auth = Authenticator::new(Arc::new(store.clone()), clock.clone());
        (sessions, auth, store, clock)
    }

    #[test]
    fn placeholder_has_digest_shape() {
        assert!(validate::is_digest(PLACEHOLDER_DIGEST));
    }

    #[tokio::test]
    async fn login_issues_a_working_session() {
        let (sessions, auth, _store, clock) = setup().await;

        let grant = sessions.login("alice.smith", &password()).await.unwrap();
        assert_eq!(grant.expires_at, clock.now() + Duration::minutes(60));

        let account = auth
            .authenticate(Credentials::new(
                Some(grant.session_token.as_str()),
                Some(grant.security_code.as_str()),
            ))
            .await
            .unwrap();
        assert_eq!(account.id, grant.account_id);

        sessions.logout(Some(grant.session_token.as_str())).await.unwrap();
        let after = auth
            .authenticate(Credentials::new(
                Some(grant.session_token.as_str()),
                Some(grant.security_code.as_str()),
            ))
            .await;
        assert!(matches!(after, Err(AuthError::Denied)));
    }

    #[tokio::test]
    async fn bad_logins_are_indistinguishable() {
        let (sessions, ..) = setup().await;
        let wrong = "8f".repeat(64);
        let right = password();

        for (user, pass) in [
            ("alice.smith", wrong.as_str()),
            ("nobody.at.all", right.as_str()),
            ("short", right.as_str()),
            ("alice.smith", "not-a-digest"),
        ] {
            assert!(matches!(sessions.login(user, pass).await, Err(SessionError::Denied)));
        }
    }

    #[tokio::test]
    async fn expired_session_is_removed_on_use() {
        let (sessions, auth, store, clock) = setup().await;
        let grant = sessions.login("alice.smith", &password()).await.unwrap();

        clock.advance(Duration::minutes(61));
        let result = auth
            .authenticate(Credentials::new(
                Some(grant.session_token.as_str()),
                Some(grant.security_code.as_str()),
            ))
            .await;
        assert!(matches!(result, Err(AuthError::Expired)));
        assert!(store.session(&grant.session_token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn logout_requires_a_well_formed_token() {
        let (sessions, ..) = setup().await;
        assert!(matches!(sessions.logout(None).await, Err(SessionError::Denied)));
        assert!(matches!(sessions.logout(Some("abc")).await, Err(SessionError::Denied)));

        let unknown = SessionToken::generate().unwrap();
        assert!(sessions.logout(Some(unknown.as_str())).await.is_ok());
    }
}
