//! Domain primitives and aggregates.
//!
//! Purpose: Define strongly typed entities shared by the repository port and
//! its adapters. Identity is explicit: transient values carry `None` ids and
//! persistent values carry sequence-generated ids.
//!
//! Public surface:
//! - `User`: a person and the emails attached for saving.
//! - `Email`: one address owned by a user.
//! - `ports`: the repository port and its error type.

pub mod email;
pub mod ports;
pub mod user;

pub use self::email::{Email, EmailAddress, EmailId};
pub use self::user::{PersonName, TEXT_COLUMN_MAX, User, UserId, UserValidationError};
