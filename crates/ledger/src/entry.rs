use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ura_core::{AccountId, Amount, DomainError, TransactionId};

/// Ledger entry category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    Outgoing,
    Incoming,
    PaymentRequest,
    Withdraw,
    Cashin,
}

impl EntryCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntryCategory::Outgoing => "outgoing",
            EntryCategory::Incoming => "incoming",
            EntryCategory::PaymentRequest => "payment_request",
            EntryCategory::Withdraw => "withdraw",
            EntryCategory::Cashin => "cashin",
        }
    }
}

impl core::fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "outgoing" => Ok(EntryCategory::Outgoing),
            "incoming" => Ok(EntryCategory::Incoming),
            "payment_request" => Ok(EntryCategory::PaymentRequest),
            "withdraw" => Ok(EntryCategory::Withdraw),
            "cashin" => Ok(EntryCategory::Cashin),
            other => Err(DomainError::validation(format!("unknown ledger category '{other}'"))),
        }
    }
}

/// One ledger row.
///
/// Immutable once written, except `processed` on a `payment_request`, which
/// moves from `false` to `true` exactly once when the request is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub category: EntryCategory,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
    pub processed: bool,
}

impl LedgerEntry {
    /// A payment request nobody has paid yet.
    pub fn is_pending_request(&self) -> bool {
        self.category == EntryCategory::PaymentRequest && !self.processed
    }
}
