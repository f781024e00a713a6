//! Strongly-typed identifiers used across the domain.
//!
//! Hex identifiers are validated on construction, so holding a `TransactionId`
//! means the value is already 64 lowercase hex characters.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::idgen::{self, GenerationError};
use crate::validate;

/// Storage key of an account (row id).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Transaction identifier shared by every ledger entry of one operation.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

/// Public account identifier (what a payer types to reach a recipient).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountIdentifier(String);

/// Session token issued at login.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

/// Per-account secret required next to the session token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SecurityCode(String);

macro_rules! impl_hex_newtype {
    ($t:ty, $name:literal, $len:expr, $bits:expr) => {
        impl $t {
            /// Number of hex characters.
            pub const LEN: usize = $len;

            /// Generate a fresh random identifier.
            pub fn generate() -> Result<Self, GenerationError> {
                idgen::generate($bits).map(Self)
            }

            pub fn parse(value: &str) -> Result<Self, DomainError> {
                if validate::is_hex(value, $len) {
                    Ok(Self(value.to_owned()))
                } else {
                    Err(DomainError::invalid_id(format!(
                        "{} must be {} lowercase hex characters",
                        $name, $len
                    )))
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_bytes()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

macro_rules! impl_public_debug {
    ($t:ty, $name:literal) => {
        impl core::fmt::Debug for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}({})", $name, self.0)
            }
        }
    };
}

// Secrets never show up in logs or panic messages.
macro_rules! impl_redacted_debug {
    ($t:ty, $name:literal) => {
        impl core::fmt::Debug for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}(<redacted>)", $name)
            }
        }
    };
}

impl_hex_newtype!(TransactionId, "TransactionId", validate::TOKEN_LEN, idgen::TRANSACTION_ID_BITS);
impl_hex_newtype!(AccountIdentifier, "AccountIdentifier", validate::CODE_LEN, idgen::ACCOUNT_IDENTIFIER_BITS);
impl_hex_newtype!(SessionToken, "SessionToken", validate::TOKEN_LEN, idgen::SESSION_TOKEN_BITS);
impl_hex_newtype!(SecurityCode, "SecurityCode", validate::CODE_LEN, idgen::SECURITY_CODE_BITS);

impl_public_debug!(TransactionId, "TransactionId");
impl_public_debug!(AccountIdentifier, "AccountIdentifier");
impl_redacted_debug!(SessionToken, "SessionToken");
impl_redacted_debug!(SecurityCode, "SecurityCode");
