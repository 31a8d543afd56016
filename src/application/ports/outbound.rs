//! Outbound ports: interfaces the application layer needs from the outside
//!
//! Persistence lives in [`crate::domain::UserRepository`]; this module holds
//! the password-hashing contract.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PasswordHashError(pub String);

/// One-way password hashing scheme.
///
/// `matches` never reverses a hash; it re-derives from the candidate and
/// compares. A malformed stored hash simply does not match.
pub trait PasswordEncoder: Send + Sync {
    fn encode(&self, raw_password: &str) -> Result<String, PasswordHashError>;
    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool;
}
