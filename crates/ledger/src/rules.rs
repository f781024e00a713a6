use chrono::{DateTime, Utc};
use thiserror::Error;

use ura_core::Amount;

/// A business rule rejected the operation.
///
/// These are not security sensitive, so clients get the specific reason. The
/// `code` is stable and machine-checkable; the message is for humans.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("payment request cannot be more than {cap}")]
    RequestCapExceeded { cap: Amount },

    #[error("payment amount exceeds {cap}")]
    TransferCapExceeded { cap: Amount },

    #[error("withdraw amount must be less than {cap}")]
    WithdrawCapExceeded { cap: Amount },

    #[error("cash in amount must be less than {cap}")]
    CashInCapExceeded { cap: Amount },

    #[error("received funds limit of {cap} reached in the past 48 hours")]
    InboundLimitReached { cap: Amount },

    #[error("cash in allowed only every 12 hours; next allowed at {next_allowed_at}")]
    CashInCooldown { next_allowed_at: DateTime<Utc> },

    #[error("cannot pay your own payment request")]
    SelfPayment,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("payment already processed")]
    AlreadyProcessed,

    #[error("payment request not found")]
    PaymentNotFound,

    #[error("recipient not found")]
    RecipientNotFound,
}

impl RuleViolation {
    pub const fn code(&self) -> &'static str {
        match self {
            RuleViolation::RequestCapExceeded { .. } => "request_cap_exceeded",
            RuleViolation::TransferCapExceeded { .. } => "transfer_cap_exceeded",
            RuleViolation::WithdrawCapExceeded { .. } => "withdraw_cap_exceeded",
            RuleViolation::CashInCapExceeded { .. } => "cashin_cap_exceeded",
            RuleViolation::InboundLimitReached { .. } => "inbound_limit_reached",
            RuleViolation::CashInCooldown { .. } => "cashin_cooldown",
            RuleViolation::SelfPayment => "self_payment",
            RuleViolation::InsufficientFunds => "insufficient_funds",
            RuleViolation::AlreadyProcessed => "already_processed",
            RuleViolation::PaymentNotFound => "payment_not_found",
            RuleViolation::RecipientNotFound => "recipient_not_found",
        }
    }
}
