//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod user_repository;

pub use user_repository::{UserPersistenceError, UserRepository};
