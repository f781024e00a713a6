pub mod payment;
pub mod system;
pub mod user;
pub mod wallet;
