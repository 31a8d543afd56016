//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod storage;

pub use crypto::BcryptPasswordEncoder;
pub use database::{init_database, DatabaseConfig};
pub use storage::InMemoryUserRepository;
