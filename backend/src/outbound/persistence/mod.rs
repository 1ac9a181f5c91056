//! PostgreSQL persistence adapter using Diesel ORM.
//!
//! Provides the `UserRepository` implementation backed by PostgreSQL through
//! `diesel-async` with `bb8` connection pooling, plus the embedded schema
//! migrations it depends on.
//!
//! Diesel row structs (`models.rs`) and the table definitions (`schema.rs`)
//! stay internal; only domain types cross the adapter boundary and every
//! database failure is mapped onto `UserPersistenceError`.
//!
//! # Example
//!
//! ```ignore
//! use user_store::DatabaseSettings;
//! use user_store::outbound::persistence::{DbPool, DieselUserRepository, run_pending_migrations};
//!
//! let settings = DatabaseSettings::default();
//! run_pending_migrations(&settings.database_url()?)?;
//! let pool = DbPool::from_settings(&settings).await?;
//! let repo = DieselUserRepository::new(pool);
//! ```

mod diesel_user_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
