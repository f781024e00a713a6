//! Caps, windows and cooldowns, and the checks that apply them.

use chrono::{DateTime, Duration, Utc};

use ura_core::{AccountId, Amount};

use crate::rules::RuleViolation;

/// Business limits.
///
/// Inclusive/exclusive bounds differ per operation:
/// - payment requests and transfers may equal their cap,
/// - withdraw and cash-in must stay strictly below theirs,
/// - the inbound limit is hit as soon as the window sum *reaches* it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    pub request_cap: Amount,
    pub transfer_cap: Amount,
    pub withdraw_cap: Amount,
    pub cash_in_cap: Amount,
    pub inbound_cap: Amount,
    pub inbound_window: Duration,
    pub cash_in_cooldown: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            request_cap: Amount::whole(100_000),
            transfer_cap: Amount::whole(200_000),
            withdraw_cap: Amount::whole(50_000),
            cash_in_cap: Amount::whole(100_000),
            inbound_cap: Amount::whole(50_000),
            inbound_window: Duration::hours(48),
            cash_in_cooldown: Duration::hours(12),
        }
    }
}

impl Limits {
    /// Start of the trailing window over which incoming funds are summed.
    pub fn inbound_window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.inbound_window
    }

    pub fn check_request(&self, amount: Amount) -> Result<(), RuleViolation> {
        if amount > self.request_cap {
            return Err(RuleViolation::RequestCapExceeded { cap: self.request_cap });
        }
        Ok(())
    }

    pub fn check_transfer(&self, amount: Amount) -> Result<(), RuleViolation> {
        if amount > self.transfer_cap {
            return Err(RuleViolation::TransferCapExceeded { cap: self.transfer_cap });
        }
        Ok(())
    }

    pub fn check_withdraw(&self, amount: Amount) -> Result<(), RuleViolation> {
        if amount >= self.withdraw_cap {
            return Err(RuleViolation::WithdrawCapExceeded { cap: self.withdraw_cap });
        }
        Ok(())
    }

    pub fn check_cash_in(&self, amount: Amount) -> Result<(), RuleViolation> {
        if amount >= self.cash_in_cap {
            return Err(RuleViolation::CashInCapExceeded { cap: self.cash_in_cap });
        }
        Ok(())
    }

    /// Would crediting `incoming` push the recipient's window sum to the cap?
    pub fn check_inbound(&self, received: Amount, incoming: Amount) -> Result<(), RuleViolation> {
        match received.checked_add(incoming) {
            Some(total) if total < self.inbound_cap => Ok(()),
            _ => Err(RuleViolation::InboundLimitReached { cap: self.inbound_cap }),
        }
    }

    /// Withdraw is blocked once the window sum already meets the cap.
    pub fn check_received(&self, received: Amount) -> Result<(), RuleViolation> {
        if received >= self.inbound_cap {
            return Err(RuleViolation::InboundLimitReached { cap: self.inbound_cap });
        }
        Ok(())
    }

    pub fn check_cooldown(
        &self,
        last_cash_in: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), RuleViolation> {
        match last_cash_in {
            Some(last) if now - last < self.cash_in_cooldown => Err(RuleViolation::CashInCooldown {
                next_allowed_at: last + self.cash_in_cooldown,
            }),
            _ => Ok(()),
        }
    }
}

pub fn check_funds(balance: Amount, amount: Amount) -> Result<(), RuleViolation> {
    if balance < amount {
        return Err(RuleViolation::InsufficientFunds);
    }
    Ok(())
}

pub fn check_distinct(payer: AccountId, recipient: AccountId) -> Result<(), RuleViolation> {
    if payer == recipient {
        return Err(RuleViolation::SelfPayment);
    }
    Ok(())
}
