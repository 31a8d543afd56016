pub mod outbound;

pub use outbound::{PasswordEncoder, PasswordHashError};
