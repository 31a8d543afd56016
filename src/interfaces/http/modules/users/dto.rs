//! User DTOs

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::domain::User;
use crate::infrastructure::crypto::password::MAX_PASSWORD_BYTES;

/// User API representation. The password hash is never exposed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    /// `ADMIN` or `CUSTOMER`
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            role: u.role.to_string(),
        }
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email(message = "username must be a valid e-mail address"))]
    pub username: String,
    #[validate(
        length(min = 6, message = "password must be at least 6 characters"),
        custom(function = "fits_bcrypt")
    )]
    pub password: String,
}

/// Change password request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "current password is required"))]
    pub current_password: String,
    #[validate(
        length(min = 6, message = "new password must be at least 6 characters"),
        custom(function = "fits_bcrypt")
    )]
    pub new_password: String,
    #[validate(
        length(min = 6, message = "confirmation must be at least 6 characters"),
        custom(function = "fits_bcrypt")
    )]
    pub confirm_password: String,
}

/// Passwords are limited by encoded size, so multi-byte characters count
/// for more than one.
fn fits_bcrypt(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::new("length").with_message(Cow::Owned(format!(
            "password must not exceed {} bytes",
            MAX_PASSWORD_BYTES
        ))));
    }
    Ok(())
}
