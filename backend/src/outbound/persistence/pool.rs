//! bb8 pool of `AsyncPgConnection`s sized from [`DatabaseSettings`].
//!
//! Each repository call checks out one connection for its whole transaction,
//! so `max_size` bounds the number of concurrent repository operations.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use tracing::debug;

use crate::config::{DatabaseSettings, SettingsError};

/// Failures while opening the pool or checking a connection out of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Settings did not yield a usable connection URL.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// bb8 refused to build the pool (for example, `min_idle` connections
    /// could not be opened).
    #[error("failed to open user store pool: {message}")]
    Build { message: String },
    /// No connection became available before the checkout timeout.
    #[error("no user store connection available: {message}")]
    Checkout { message: String },
}

/// Resolved pool parameters.
///
/// Fields are public so callers can override a default with struct update
/// syntax: `PoolConfig { max_size: 2, ..PoolConfig::new(url) }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub database_url: String,
    pub max_size: u32,
    pub min_idle: Option<u32>,
    pub connection_timeout: Duration,
}

impl PoolConfig {
    /// 10 connections, 2 kept idle, 30 second checkout timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            min_idle: Some(2),
            connection_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared pool handed to [`super::DieselUserRepository`].
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Resolve `settings` and open the pool in one step.
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, PoolError> {
        Self::connect(settings.pool_config()?).await
    }

    /// Open a pool with already resolved parameters.
    pub async fn connect(config: PoolConfig) -> Result<Self, PoolError> {
        debug!(
            max_size = config.max_size,
            min_idle = config.min_idle,
            timeout_ms = u64::try_from(config.connection_timeout.as_millis()).unwrap_or(u64::MAX),
            "opening user store pool"
        );
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.database_url);
        let inner = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::Build {
                message: err.to_string(),
            })?;
        Ok(Self { inner })
    }

    pub(super) async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner.get().await.map_err(|err| PoolError::Checkout {
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_match_documented_sizing() {
        let config = PoolConfig::new("postgresql://localhost/users");

        assert_eq!(config.max_size, 10);
        assert_eq!(config.min_idle, Some(2));
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
    }

    #[rstest]
    #[tokio::test]
    async fn blank_settings_url_fails_before_connecting() {
        let settings = DatabaseSettings {
            url: Some(String::new()),
            ..DatabaseSettings::default()
        };

        let err = DbPool::from_settings(&settings)
            .await
            .err()
            .expect("blank url is rejected");

        assert_eq!(err, PoolError::Settings(SettingsError::EmptyUrl));
    }

    #[rstest]
    #[tokio::test]
    async fn unreachable_server_fails_to_build_with_idle_connections() {
        let config = PoolConfig {
            min_idle: Some(1),
            connection_timeout: Duration::from_millis(200),
            ..PoolConfig::new("postgresql://nobody@127.0.0.1:1/users")
        };

        let err = DbPool::connect(config).await.err().expect("nothing on port 1");

        assert!(matches!(err, PoolError::Build { .. }));
    }
}
