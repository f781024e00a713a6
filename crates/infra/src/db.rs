//! SQLite connection pool and schema.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

use crate::config::Config;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        username        TEXT    NOT NULL UNIQUE,
        email           TEXT    NOT NULL,
        password_digest TEXT    NOT NULL,
        identifier      TEXT    NOT NULL UNIQUE,
        security_code   TEXT    NOT NULL,
        balance         INTEGER NOT NULL DEFAULT 0,
        created_at      INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        token      TEXT    PRIMARY KEY,
        account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        expires_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ledger_entries (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        transaction_id TEXT    NOT NULL,
        account_id     INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        category       TEXT    NOT NULL,
        amount         INTEGER NOT NULL CHECK (amount > 0),
        created_at     INTEGER NOT NULL,
        processed      INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS ledger_entries_account_category_created
        ON ledger_entries (account_id, category, created_at)",
    "CREATE UNIQUE INDEX IF NOT EXISTS ledger_entries_transaction_category
        ON ledger_entries (transaction_id, category)",
    "CREATE INDEX IF NOT EXISTS sessions_account ON sessions (account_id)",
];

/// Open the pool described by `config` and make sure the schema exists.
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(config.storage_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.storage_timeout)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    info!(database_url = %config.database_url, "database ready");
    Ok(pool)
}

/// Single-connection in-memory database (tests, local experiments).
///
/// An in-memory SQLite database lives and dies with its connection, so the
/// pool holds exactly one and never recycles it.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
