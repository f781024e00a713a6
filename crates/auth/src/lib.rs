//! `ura-auth`: session authentication boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: the transport
//! hands over raw header values, storage is reached through [`SessionStore`].

pub mod authenticator;
pub mod credentials;
pub mod secret;
pub mod session;
pub mod store;

pub use authenticator::{AuthError, Authenticator, SessionStatus, parse_token};
pub use credentials::Credentials;
pub use secret::secrets_match;
pub use session::{Session, SessionValidationError, validate_session};
pub use store::{BoxError, SessionStore};
