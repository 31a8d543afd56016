use async_trait::async_trait;

use super::{NewUser, User, UserRole};
use crate::domain::RepositoryError;

/// Persistence port for user accounts.
///
/// Implementations enforce username uniqueness themselves and report a
/// clash as [`RepositoryError::UniqueViolation`]. Each write must be atomic.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new account; `user.password` is already hashed.
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;
    /// Write back an existing account.
    async fn update(&self, user: User) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_role_by_username(&self, username: &str)
        -> Result<Option<UserRole>, RepositoryError>;
    async fn find_all(&self) -> Result<Vec<User>, RepositoryError>;
}
