//! Infrastructure layer: configuration, SQLite storage and the services that
//! run on top of it.

pub mod config;
pub mod db;
pub mod locks;
pub mod processor;
pub mod rate_limit;
pub mod sessions;
pub mod store;

pub use config::{Config, ConfigError, RateLimitConfig};
pub use locks::AccountLocks;
pub use processor::{LedgerTransactionProcessor, Receipt, TransactionError};
pub use rate_limit::{RateLimiter, SweeperHandle, client_key};
pub use sessions::{LoginGrant, SessionError, SessionService};
pub use store::{LedgerTx, NewAccount, SqliteStore, StoreError};
