pub mod error;
pub mod user;

pub use error::{DomainError, DomainResult, RepositoryError};
pub use user::{NewUser, User, UserRepository, UserRole};
