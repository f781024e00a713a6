use async_trait::async_trait;

use ura_core::{Account, AccountId, SessionToken};

use crate::session::Session;

/// Opaque storage failure; the cause is logged, never shown to clients.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What the authenticator needs from storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn find_session(&self, token: &SessionToken) -> Result<Option<Session>, BoxError>;

    /// Delete a session. Deleting an unknown token is not an error.
    async fn delete_session(&self, token: &SessionToken) -> Result<(), BoxError>;

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, BoxError>;
}
