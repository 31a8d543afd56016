pub mod identity;
pub mod ports;

pub use identity::UserService;
pub use ports::{PasswordEncoder, PasswordHashError};
