//! Service wiring: one explicitly constructed set of services per process.

use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;

use ura_auth::Authenticator;
use ura_core::{Clock, SystemClock};
use ura_infra::{
    Config, LedgerTransactionProcessor, RateLimiter, SessionService, SqliteStore, db,
};
use ura_ledger::Limits;

pub struct AppServices {
    pub store: SqliteStore,
    pub authenticator: Authenticator,
    pub sessions: SessionService,
    pub processor: LedgerTransactionProcessor,
    pub limiter: Arc<RateLimiter>,
    pub trust_forwarded_for: bool,
}

impl AppServices {
    /// Wire every service over an already opened pool.
    pub fn new(pool: SqlitePool, config: &Config, clock: Arc<dyn Clock>) -> Self {
        let store = SqliteStore::new(pool, config.storage_timeout);

        Self {
            authenticator: Authenticator::new(Arc::new(store.clone()), clock.clone()),
            sessions: SessionService::new(store.clone(), clock.clone(), config.session_ttl),
            processor: LedgerTransactionProcessor::new(store.clone(), Limits::default(), clock),
            limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            trust_forwarded_for: config.rate_limit.trust_forwarded_for,
            store,
        }
    }
}

/// Production wiring: open the configured database and use the system clock.
pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    let pool = db::connect(config)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    Ok(AppServices::new(pool, config, Arc::new(SystemClock)))
}
