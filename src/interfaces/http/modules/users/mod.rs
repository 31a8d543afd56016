//! Users module: registration, lookup and password change

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
