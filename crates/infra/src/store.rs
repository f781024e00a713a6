//! SQLite-backed wallet storage.
//!
//! Every call is bounded by the configured storage timeout. A call that runs
//! out of time is reported as [`StoreError::Timeout`] and is never retried
//! here; inside a [`LedgerTx`] the caller drops the transaction and SQLite
//! rolls the whole unit back.
//!
//! ## Representation
//!
//! | Domain | Column |
//! |--------|--------|
//! | `Amount` | `INTEGER` minor units |
//! | `DateTime<Utc>` | `INTEGER` Unix milliseconds |
//! | `processed` | `INTEGER` 0/1 |

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use thiserror::Error;
use tracing::instrument;

use ura_auth::{BoxError, Session, SessionStore};
use ura_core::{
    Account, AccountId, AccountIdentifier, Amount, GenerationError, SecurityCode, SessionToken,
    TransactionId,
};
use ura_ledger::{EntryCategory, LedgerEntry};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage call '{operation}' timed out")]
    Timeout { operation: &'static str },

    #[error("database error in {operation}: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("corrupt row in {operation}: {detail}")]
    Corrupt {
        operation: &'static str,
        detail: String,
    },

    #[error("{0} not found")]
    Missing(&'static str),
}

/// Fields of an account about to be inserted.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub identifier: AccountIdentifier,
    pub security_code: SecurityCode,
    pub balance: Amount,
}

impl NewAccount {
    /// Fresh public identifier and security code for a new account.
    pub fn generate(
        username: impl Into<String>,
        email: impl Into<String>,
        password_digest: impl Into<String>,
        balance: Amount,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            username: username.into(),
            email: email.into(),
            password_digest: password_digest.into(),
            identifier: AccountIdentifier::generate()?,
            security_code: SecurityCode::generate()?,
            balance,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    timeout: Duration,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[instrument(skip(self, account), fields(username = %account.username), err)]
    pub async fn create_account(
        &self,
        account: NewAccount,
        now: DateTime<Utc>,
    ) -> Result<Account, StoreError> {
        let query = sqlx::query(
            r#"
            INSERT INTO accounts (username, email, password_digest, identifier, security_code, balance, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_digest)
        .bind(account.identifier.as_str())
        .bind(account.security_code.as_str())
        .bind(account.balance.minor_units())
        .bind(now.timestamp_millis())
        .execute(&self.pool);

        let result = bounded(self.timeout, "create_account", query).await?;

        Ok(Account {
            id: AccountId::new(result.last_insert_rowid()),
            username: account.username,
            email: account.email,
            identifier: account.identifier,
            security_code: account.security_code,
            balance: account.balance,
            created_at: from_millis("create_account", now.timestamp_millis())?,
        })
    }

    #[instrument(skip(self), fields(account_id = %id), err)]
    pub async fn account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let sql = format!("{ACCOUNT_SELECT} WHERE id = ?");
        let query = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool);

        bounded(self.timeout, "account", query)
            .await?
            .map(|row| account_from_row("account", &row))
            .transpose()
    }

    #[instrument(skip(self), fields(identifier = %identifier), err)]
    pub async fn account_by_identifier(
        &self,
        identifier: &AccountIdentifier,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!("{ACCOUNT_SELECT} WHERE identifier = ?");
        let query = sqlx::query(&sql)
            .bind(identifier.as_str())
            .fetch_optional(&self.pool);

        bounded(self.timeout, "account_by_identifier", query)
            .await?
            .map(|row| account_from_row("account_by_identifier", &row))
            .transpose()
    }

    /// Account plus its stored password digest, for login.
    #[instrument(skip(self), err)]
    pub async fn login_record(&self, username: &str) -> Result<Option<(Account, String)>, StoreError> {
        let sql = format!("{ACCOUNT_SELECT} WHERE username = ?");
        let query = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool);

        match bounded(self.timeout, "login_record", query).await? {
            Some(row) => {
                let account = account_from_row("login_record", &row)?;
                let digest: String = get(&row, "login_record", "password_digest")?;
                Ok(Some((account, digest)))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, session), fields(account_id = %session.account_id), err)]
    pub async fn insert_session(&self, session: &Session) -> Result<(), StoreError> {
        let query = sqlx::query("INSERT INTO sessions (token, account_id, expires_at) VALUES (?, ?, ?)")
            .bind(session.token.as_str())
            .bind(session.account_id.get())
            .bind(session.expires_at.timestamp_millis())
            .execute(&self.pool);

        bounded(self.timeout, "insert_session", query).await?;
        Ok(())
    }

    #[instrument(skip(self, token), err)]
    pub async fn session(&self, token: &SessionToken) -> Result<Option<Session>, StoreError> {
        let query = sqlx::query("SELECT account_id, expires_at FROM sessions WHERE token = ?")
            .bind(token.as_str())
            .fetch_optional(&self.pool);

        match bounded(self.timeout, "session", query).await? {
            Some(row) => Ok(Some(Session {
                token: token.clone(),
                account_id: AccountId::new(get(&row, "session", "account_id")?),
                expires_at: from_millis("session", get(&row, "session", "expires_at")?)?,
            })),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, token), err)]
    pub async fn remove_session(&self, token: &SessionToken) -> Result<(), StoreError> {
        let query = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token.as_str())
            .execute(&self.pool);

        bounded(self.timeout, "remove_session", query).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(transaction_id = %transaction_id, category = %category), err)]
    pub async fn entry(
        &self,
        transaction_id: &TransactionId,
        category: EntryCategory,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let sql = format!("{ENTRY_SELECT} WHERE transaction_id = ? AND category = ?");
        let query = sqlx::query(&sql)
        .bind(transaction_id.as_str())
        .bind(category.as_str())
        .fetch_optional(&self.pool);

        bounded(self.timeout, "entry", query)
            .await?
            .map(|row| entry_from_row("entry", &row))
            .transpose()
    }

    /// Ledger history of one account, newest first.
    #[instrument(skip(self), fields(account_id = %account_id), err)]
    pub async fn entries_for(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, StoreError> {
        let sql = format!("{ENTRY_SELECT} WHERE account_id = ? ORDER BY created_at DESC, id DESC");
        let query = sqlx::query(&sql)
        .bind(account_id.get())
        .fetch_all(&self.pool);

        bounded(self.timeout, "entries_for", query)
            .await?
            .iter()
            .map(|row| entry_from_row("entries_for", row))
            .collect()
    }

    /// Open a write unit. Dropping the returned value without
    /// [`LedgerTx::commit`] rolls everything back.
    pub async fn begin(&self) -> Result<LedgerTx, StoreError> {
        let tx = bounded(self.timeout, "begin", self.pool.begin()).await?;
        Ok(LedgerTx {
            tx,
            timeout: self.timeout,
        })
    }
}

/// One storage transaction over the ledger and balances.
///
/// SQLite only upgrades a reader to a writer if nobody else wrote in between,
/// so callers must start every unit with a write ([`LedgerTx::mark_processed`]
/// or [`LedgerTx::touch_account`]) before reading anything inside it.
pub struct LedgerTx {
    tx: Transaction<'static, Sqlite>,
    timeout: Duration,
}

impl LedgerTx {
    /// The settlement fence: flip `processed` 0 -> 1.
    ///
    /// Returns `false` when no pending row matched, meaning someone else
    /// already settled it.
    pub async fn mark_processed(
        &mut self,
        transaction_id: &TransactionId,
        category: EntryCategory,
    ) -> Result<bool, StoreError> {
        let query = sqlx::query(
            "UPDATE ledger_entries SET processed = 1 WHERE transaction_id = ? AND category = ? AND processed = 0",
        )
        .bind(transaction_id.as_str())
        .bind(category.as_str())
        .execute(&mut *self.tx);

        let result = bounded(self.timeout, "mark_processed", query).await?;
        Ok(result.rows_affected() == 1)
    }

    /// No-op write on the account row: takes the SQLite write lock and
    /// reports whether the account exists.
    pub async fn touch_account(&mut self, account_id: AccountId) -> Result<bool, StoreError> {
        let query = sqlx::query("UPDATE accounts SET balance = balance WHERE id = ?")
            .bind(account_id.get())
            .execute(&mut *self.tx);

        let result = bounded(self.timeout, "touch_account", query).await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn balance(&mut self, account_id: AccountId) -> Result<Option<Amount>, StoreError> {
        let query = sqlx::query("SELECT balance FROM accounts WHERE id = ?")
            .bind(account_id.get())
            .fetch_optional(&mut *self.tx);

        match bounded(self.timeout, "balance", query).await? {
            Some(row) => Ok(Some(amount_from(
                "balance",
                get(&row, "balance", "balance")?,
            )?)),
            None => Ok(None),
        }
    }

    /// Conditional debit; `false` if the balance would go negative.
    pub async fn debit(&mut self, account_id: AccountId, amount: Amount) -> Result<bool, StoreError> {
        let query = sqlx::query("UPDATE accounts SET balance = balance - ? WHERE id = ? AND balance >= ?")
            .bind(amount.minor_units())
            .bind(account_id.get())
            .bind(amount.minor_units())
            .execute(&mut *self.tx);

        let result = bounded(self.timeout, "debit", query).await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn credit(&mut self, account_id: AccountId, amount: Amount) -> Result<bool, StoreError> {
        let query = sqlx::query("UPDATE accounts SET balance = balance + ? WHERE id = ?")
            .bind(amount.minor_units())
            .bind(account_id.get())
            .execute(&mut *self.tx);

        let result = bounded(self.timeout, "credit", query).await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn insert_entry(&mut self, entry: &LedgerEntry) -> Result<(), StoreError> {
        let query = sqlx::query(
            r#"
            INSERT INTO ledger_entries (transaction_id, account_id, category, amount, created_at, processed)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.transaction_id.as_str())
        .bind(entry.account_id.get())
        .bind(entry.category.as_str())
        .bind(entry.amount.minor_units())
        .bind(entry.created_at.timestamp_millis())
        .bind(entry.processed)
        .execute(&mut *self.tx);

        bounded(self.timeout, "insert_entry", query).await?;
        Ok(())
    }

    /// Sum of settled `incoming` entries created after `since`.
    pub async fn incoming_since(
        &mut self,
        account_id: AccountId,
        since: DateTime<Utc>,
    ) -> Result<Amount, StoreError> {
        let query = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount), 0) AS total
            FROM ledger_entries
            WHERE account_id = ? AND category = 'incoming' AND processed = 1 AND created_at > ?
            "#,
        )
        .bind(account_id.get())
        .bind(since.timestamp_millis())
        .fetch_one(&mut *self.tx);

        let row = bounded(self.timeout, "incoming_since", query).await?;
        amount_from("incoming_since", get(&row, "incoming_since", "total")?)
    }

    /// `created_at` of the newest entry of `category` for the account.
    pub async fn latest_entry_at(
        &mut self,
        account_id: AccountId,
        category: EntryCategory,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let query = sqlx::query(
            "SELECT MAX(created_at) AS latest FROM ledger_entries WHERE account_id = ? AND category = ?",
        )
        .bind(account_id.get())
        .bind(category.as_str())
        .fetch_one(&mut *self.tx);

        let row = bounded(self.timeout, "latest_entry_at", query).await?;
        let latest: Option<i64> = get(&row, "latest_entry_at", "latest")?;
        latest.map(|ms| from_millis("latest_entry_at", ms)).transpose()
    }

    pub async fn commit(self) -> Result<(), StoreError> {
        bounded(self.timeout, "commit", self.tx.commit()).await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn find_session(&self, token: &SessionToken) -> Result<Option<Session>, BoxError> {
        Ok(self.session(token).await?)
    }

    async fn delete_session(&self, token: &SessionToken) -> Result<(), BoxError> {
        Ok(self.remove_session(token).await?)
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, BoxError> {
        Ok(self.account(id).await?)
    }
}

const ACCOUNT_SELECT: &str =
    "SELECT id, username, email, password_digest, identifier, security_code, balance, created_at FROM accounts";

const ENTRY_SELECT: &str =
    "SELECT transaction_id, account_id, category, amount, created_at, processed FROM ledger_entries";

/// Run a storage future under the timeout, mapping both failure kinds.
async fn bounded<T, F>(timeout: Duration, operation: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|source| StoreError::Database { operation, source }),
        Err(_) => Err(StoreError::Timeout { operation }),
    }
}

fn get<'r, T>(row: &'r SqliteRow, operation: &'static str, column: &'static str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Corrupt {
            operation,
            detail: format!("column {column}: {e}"),
        })
}

fn corrupt(operation: &'static str, detail: impl core::fmt::Display) -> StoreError {
    StoreError::Corrupt {
        operation,
        detail: detail.to_string(),
    }
}

fn from_millis(operation: &'static str, ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| corrupt(operation, format!("timestamp {ms} out of range")))
}

fn amount_from(operation: &'static str, minor: i64) -> Result<Amount, StoreError> {
    Amount::from_minor_units(minor).map_err(|e| corrupt(operation, e))
}

fn account_from_row(operation: &'static str, row: &SqliteRow) -> Result<Account, StoreError> {
    let identifier: String = get(row, operation, "identifier")?;
    let security_code: String = get(row, operation, "security_code")?;

    Ok(Account {
        id: AccountId::new(get(row, operation, "id")?),
        username: get(row, operation, "username")?,
        email: get(row, operation, "email")?,
        identifier: AccountIdentifier::parse(&identifier).map_err(|e| corrupt(operation, e))?,
        security_code: SecurityCode::parse(&security_code).map_err(|e| corrupt(operation, e))?,
        balance: amount_from(operation, get(row, operation, "balance")?)?,
        created_at: from_millis(operation, get(row, operation, "created_at")?)?,
    })
}

fn entry_from_row(operation: &'static str, row: &SqliteRow) -> Result<LedgerEntry, StoreError> {
    let transaction_id: String = get(row, operation, "transaction_id")?;
    let category: String = get(row, operation, "category")?;

    Ok(LedgerEntry {
        transaction_id: TransactionId::parse(&transaction_id).map_err(|e| corrupt(operation, e))?,
        account_id: AccountId::new(get(row, operation, "account_id")?),
        category: category.parse().map_err(|e| corrupt(operation, e))?,
        amount: amount_from(operation, get(row, operation, "amount")?)?,
        created_at: from_millis(operation, get(row, operation, "created_at")?)?,
        processed: get(row, operation, "processed")?,
    })
}
