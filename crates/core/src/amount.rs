//! Monetary amounts.
//!
//! An [`Amount`] is a non-negative value held in minor units (hundredths), the
//! same representation the ledger stores. Client input arrives as a decimal
//! string and goes through [`Amount::parse`]; `rust_decimal` does the parsing
//! and rendering so no float ever touches a balance.

use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Serialize, Serializer};

use crate::error::{DomainError, DomainResult};
use crate::validate;
use crate::value_object::ValueObject;

const MINOR_PER_UNIT: i64 = 100;

/// Largest amount accepted from input, in whole units.
pub const MAX_UNITS: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl ValueObject for Amount {}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Parse a client-supplied decimal string.
    ///
    /// Accepts digits with at most one `.` (`"5."` and `".5"` included), at most
    /// two fractional digits, strictly positive and no larger than
    /// [`MAX_UNITS`].
    pub fn parse(input: &str) -> DomainResult<Self> {
        if input.is_empty() {
            return Err(DomainError::validation("amount is required"));
        }
        if !validate::is_amount(input) {
            return Err(DomainError::validation("amount must be a plain decimal number"));
        }

        let normalized = match (input.strip_prefix('.'), input.strip_suffix('.')) {
            (Some(frac), _) => format!("0.{frac}"),
            (_, Some(whole)) => whole.to_owned(),
            _ => input.to_owned(),
        };

        let value = Decimal::from_str(&normalized)
            .map_err(|_| DomainError::validation("amount is out of range"))?;

        if value.normalize().scale() > 2 {
            return Err(DomainError::validation(
                "amount cannot have more than two decimal places",
            ));
        }
        if value > Decimal::from(MAX_UNITS) {
            return Err(DomainError::validation("amount is out of range"));
        }
        if value.is_zero() {
            return Err(DomainError::validation("amount must be greater than zero"));
        }

        let minor = value * Decimal::from(MINOR_PER_UNIT);
        let minor = minor
            .trunc()
            .to_i64()
            .ok_or_else(|| DomainError::validation("amount is out of range"))?;

        Ok(Self(minor))
    }

    /// Whole currency units, e.g. `Amount::whole(50_000)`.
    pub const fn whole(units: i64) -> Self {
        Self(units * MINOR_PER_UNIT)
    }

    /// Build from stored minor units.
    ///
    /// Negative values are rejected: balances and ledger amounts never go below
    /// zero.
    pub fn from_minor_units(minor: i64) -> DomainResult<Self> {
        if minor < 0 {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        Ok(Self(minor))
    }

    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        match self.0.checked_sub(other.0) {
            Some(v) if v >= 0 => Some(Amount(v)),
            _ => None,
        }
    }

    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.to_decimal(), f)
    }
}

impl FromStr for Amount {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Amounts travel as strings (`"500.00"`) so clients never round through floats.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
