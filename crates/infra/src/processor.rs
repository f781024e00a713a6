//! Ledger transaction processor: every operation that moves or reserves money.
//!
//! ## Unit of work
//!
//! Accepted operations run as:
//! 1. cheap input checks (amount format, caps) with no I/O,
//! 2. per-account locks for every account whose balance may change,
//! 3. one storage transaction that starts with a write, re-reads balances and
//!    window sums, applies the mutation and commits.
//!
//! Any rejection after step 3 begins drops the transaction, which rolls back
//! everything including the settlement fence. The same happens when the caller
//! goes away mid-operation (the future is dropped).

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use ura_core::{
    Account, AccountId, AccountIdentifier, Amount, Clock, DomainError, GenerationError,
    TransactionId,
};
use ura_ledger::{EntryCategory, LedgerEntry, Limits, RuleViolation, check_distinct, check_funds};

use crate::locks::AccountLocks;
use crate::store::{LedgerTx, SqliteStore, StoreError};

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Rule(#[from] RuleViolation),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("identifier generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// What a successful operation hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub transaction_id: TransactionId,
    pub amount: Amount,
}

pub struct LedgerTransactionProcessor {
    store: SqliteStore,
    locks: AccountLocks,
    limits: Limits,
    clock: Arc<dyn Clock>,
}

impl LedgerTransactionProcessor {
    pub fn new(store: SqliteStore, limits: Limits, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            locks: AccountLocks::new(),
            limits,
            clock,
        }
    }

    /// Record a pending payment request for `requester`. No balance changes.
    #[instrument(skip(self, requester), fields(account_id = %requester.id), err)]
    pub async fn request_payment(&self, requester: &Account, amount: &str) -> Result<Receipt, TransactionError> {
        let amount = Amount::parse(amount)?;
        self.limits.check_request(amount)?;

        let entry = self.new_entry(requester.id, EntryCategory::PaymentRequest, amount, false)?;

        let mut tx = self.store.begin().await?;
        tx.insert_entry(&entry).await?;
        tx.commit().await?;

        info!(transaction_id = %entry.transaction_id, amount = %amount, "payment request created");
        Ok(receipt(&entry))
    }

    /// Settle a pending payment request: `payer` pays the requester.
    ///
    /// Safe to retry: the fence lets exactly one caller settle a request, every
    /// other caller gets [`RuleViolation::AlreadyProcessed`].
    #[instrument(skip(self, payer), fields(account_id = %payer.id), err)]
    pub async fn process_payment(&self, payer: &Account, transaction_id: &str) -> Result<Receipt, TransactionError> {
        let transaction_id = TransactionId::parse(transaction_id)?;

        let request = self
            .store
            .entry(&transaction_id, EntryCategory::PaymentRequest)
            .await?
            .ok_or(RuleViolation::PaymentNotFound)?;
        if !request.is_pending_request() {
            return Err(RuleViolation::AlreadyProcessed.into());
        }

        let recipient = request.account_id;
        let amount = request.amount;
        check_distinct(payer.id, recipient)?;
        self.limits.check_request(amount)?;

        let _guard = self.locks.lock(&[payer.id, recipient]).await;
        let mut tx = self.store.begin().await?;

        if !tx.mark_processed(&transaction_id, EntryCategory::PaymentRequest).await? {
            return Err(RuleViolation::AlreadyProcessed.into());
        }

        let balance = tx.balance(payer.id).await?.ok_or(StoreError::Missing("payer account"))?;
        check_funds(balance, amount)?;
        self.check_inbound(&mut tx, recipient, amount).await?;

        if !tx.debit(payer.id, amount).await? {
            return Err(RuleViolation::InsufficientFunds.into());
        }
        if !tx.credit(recipient, amount).await? {
            return Err(StoreError::Missing("recipient account").into());
        }

        let incoming = LedgerEntry {
            transaction_id: transaction_id.clone(),
            account_id: recipient,
            category: EntryCategory::Incoming,
            amount,
            created_at: self.clock.now(),
            processed: true,
        };
        tx.insert_entry(&incoming).await?;
        tx.commit().await?;

        info!(transaction_id = %transaction_id, recipient_id = %recipient, amount = %amount, "payment settled");
        Ok(receipt(&incoming))
    }

    /// Reserve a withdrawal. Settlement happens elsewhere, so the balance is
    /// checked but not debited.
    #[instrument(skip(self, account), fields(account_id = %account.id), err)]
    pub async fn withdraw(&self, account: &Account, amount: &str) -> Result<Receipt, TransactionError> {
        let amount = Amount::parse(amount)?;
        self.limits.check_withdraw(amount)?;

        let entry = self.new_entry(account.id, EntryCategory::Withdraw, amount, false)?;

        let _guard = self.locks.lock(&[account.id]).await;
        let mut tx = self.store.begin().await?;
        if !tx.touch_account(account.id).await? {
            return Err(StoreError::Missing("account").into());
        }

        let since = self.limits.inbound_window_start(self.clock.now());
        let received = tx.incoming_since(account.id, since).await?;
        self.limits.check_received(received)?;

        let balance = tx.balance(account.id).await?.ok_or(StoreError::Missing("account"))?;
        check_funds(balance, amount)?;

        tx.insert_entry(&entry).await?;
        tx.commit().await?;

        info!(transaction_id = %entry.transaction_id, amount = %amount, "withdraw recorded");
        Ok(receipt(&entry))
    }

    /// Record a cash-in, at most once per cooldown period.
    #[instrument(skip(self, account), fields(account_id = %account.id), err)]
    pub async fn cash_in(&self, account: &Account, amount: &str) -> Result<Receipt, TransactionError> {
        let amount = Amount::parse(amount)?;
        self.limits.check_cash_in(amount)?;

        let entry = self.new_entry(account.id, EntryCategory::Cashin, amount, false)?;

        let _guard = self.locks.lock(&[account.id]).await;
        let mut tx = self.store.begin().await?;
        if !tx.touch_account(account.id).await? {
            return Err(StoreError::Missing("account").into());
        }

        let last = tx.latest_entry_at(account.id, EntryCategory::Cashin).await?;
        self.limits.check_cooldown(last, entry.created_at)?;

        tx.insert_entry(&entry).await?;
        tx.commit().await?;

        info!(transaction_id = %entry.transaction_id, amount = %amount, "cash in recorded");
        Ok(receipt(&entry))
    }

    /// Pay another account directly by its public identifier.
    #[instrument(skip(self, payer, recipient_identifier), fields(account_id = %payer.id), err)]
    pub async fn transfer(
        &self,
        payer: &Account,
        recipient_identifier: &str,
        amount: &str,
    ) -> Result<Receipt, TransactionError> {
        let amount = Amount::parse(amount)?;
        self.limits.check_transfer(amount)?;

        let identifier =
            AccountIdentifier::parse(recipient_identifier).map_err(|_| RuleViolation::RecipientNotFound)?;
        let recipient = self
            .store
            .account_by_identifier(&identifier)
            .await?
            .ok_or(RuleViolation::RecipientNotFound)?;
        check_distinct(payer.id, recipient.id)?;

        let outgoing = self.new_entry(payer.id, EntryCategory::Outgoing, amount, true)?;
        let incoming = LedgerEntry {
            account_id: recipient.id,
            category: EntryCategory::Incoming,
            ..outgoing.clone()
        };

        let _guard = self.locks.lock(&[payer.id, recipient.id]).await;
        let mut tx = self.store.begin().await?;
        if !tx.touch_account(payer.id).await? {
            return Err(StoreError::Missing("payer account").into());
        }

        let balance = tx.balance(payer.id).await?.ok_or(StoreError::Missing("payer account"))?;
        check_funds(balance, amount)?;
        self.check_inbound(&mut tx, recipient.id, amount).await?;

        if !tx.debit(payer.id, amount).await? {
            return Err(RuleViolation::InsufficientFunds.into());
        }
        if !tx.credit(recipient.id, amount).await? {
            return Err(RuleViolation::RecipientNotFound.into());
        }
        tx.insert_entry(&outgoing).await?;
        tx.insert_entry(&incoming).await?;
        tx.commit().await?;

        info!(transaction_id = %outgoing.transaction_id, recipient_id = %recipient.id, amount = %amount, "transfer completed");
        Ok(receipt(&outgoing))
    }

    async fn check_inbound(
        &self,
        tx: &mut LedgerTx,
        recipient: AccountId,
        amount: Amount,
    ) -> Result<(), TransactionError> {
        let since = self.limits.inbound_window_start(self.clock.now());
        let received = tx.incoming_since(recipient, since).await?;
        if let Err(violation) = self.limits.check_inbound(received, amount) {
            warn!(recipient_id = %recipient, received = %received, "inbound limit reached");
            return Err(violation.into());
        }
        Ok(())
    }

    fn new_entry(
        &self,
        account_id: AccountId,
        category: EntryCategory,
        amount: Amount,
        processed: bool,
    ) -> Result<LedgerEntry, GenerationError> {
        Ok(LedgerEntry {
            transaction_id: TransactionId::generate()?,
            account_id,
            category,
            amount,
            created_at: self.clock.now(),
            processed,
        })
    }
}

fn receipt(entry: &LedgerEntry) -> Receipt {
    Receipt {
        transaction_id: entry.transaction_id.clone(),
        amount: entry.amount,
    }
}
