//! Password hashing utilities

use bcrypt::{hash, verify, DEFAULT_COST};
use tracing::warn;

use crate::application::ports::{PasswordEncoder, PasswordHashError};

/// bcrypt ignores everything past this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Same value as bcrypt's (private) `MIN_COST`; used to keep tests fast.
#[cfg(test)]
pub(crate) const BCRYPT_MIN_COST: u32 = 4;

/// bcrypt-backed [`PasswordEncoder`].
#[derive(Debug, Clone)]
pub struct BcryptPasswordEncoder {
    cost: u32,
}

impl BcryptPasswordEncoder {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordEncoder for BcryptPasswordEncoder {
    fn encode(&self, raw_password: &str) -> Result<String, PasswordHashError> {
        if raw_password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordHashError(format!(
                "password exceeds {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        hash(raw_password, self.cost).map_err(|e| PasswordHashError(e.to_string()))
    }

    fn matches(&self, raw_password: &str, encoded_password: &str) -> bool {
        // Longer input would be truncated by bcrypt and could match a prefix.
        if raw_password.len() > MAX_PASSWORD_BYTES {
            return false;
        }
        match verify(raw_password, encoded_password) {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Stored password hash could not be verified: {}", e);
                false
            }
        }
    }
}
