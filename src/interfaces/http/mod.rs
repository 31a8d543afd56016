//! HTTP REST API interfaces
//!
//! - `common`: shared extractors (`ValidatedJson`)
//! - `error`: error-to-status translation and the `ErrorMessage` body
//! - `middleware`: JWT authentication and the `AuthenticatedUser` extractor
//! - `modules`: request handlers and DTOs per resource
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod error;
pub mod middleware;
pub mod modules;
pub mod router;

pub use error::{ApiError, ErrorMessage};
pub use router::{create_api_router, ApiState};
