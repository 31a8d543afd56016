//! Identity module: user management
//!
//! Contains the `UserService` which orchestrates all user-related
//! use-cases: registration, lookups, password changes and credential checks.

pub mod service;

pub use service::UserService;
