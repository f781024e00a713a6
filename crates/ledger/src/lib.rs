//! `ura-ledger`: wallet business rules.
//!
//! Pure decisions only: the caller reads balances and ledger sums from storage
//! and asks [`Limits`] whether an operation may proceed. Nothing here performs
//! I/O, so every rule is testable with plain values.

pub mod entry;
pub mod limits;
pub mod rules;

pub use entry::{EntryCategory, LedgerEntry};
pub use limits::{Limits, check_distinct, check_funds};
pub use rules::RuleViolation;
