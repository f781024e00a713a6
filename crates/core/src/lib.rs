//! `ura-core`: wallet domain primitives.
//!
//! This crate contains **pure domain** building blocks (no storage, no HTTP):
//! typed identifiers, amounts, the account record, the identifier generator and
//! the input validators every other layer depends on.

pub mod account;
pub mod amount;
pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod idgen;
pub mod validate;
pub mod value_object;

pub use account::Account;
pub use amount::Amount;
pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, AccountIdentifier, SecurityCode, SessionToken, TransactionId};
pub use idgen::GenerationError;
pub use value_object::ValueObject;
