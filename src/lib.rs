//! # Parking Service
//!
//! User account management for the parking backend: registration,
//! password changes, lookups and JWT login over a REST API.
//!
//! ## Architecture
//!
//! - **domain**: user model, repository port and domain errors
//! - **application**: `UserService` use cases and the password-encoder port
//! - **infrastructure**: SeaORM/SQLite and in-memory repositories, bcrypt, JWT
//! - **interfaces**: axum REST API and the error translator
//! - **server**: runtime bootstrap and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig};
pub use interfaces::http::create_api_router;
