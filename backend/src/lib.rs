//! Persistent user and email records with PostgreSQL and in-memory storage.

pub mod config;
pub mod domain;
pub mod outbound;

pub use config::{DatabaseSettings, SettingsError};
pub use domain::ports::{UserPersistenceError, UserRepository};
pub use domain::{Email, EmailAddress, EmailId, PersonName, User, UserId};
