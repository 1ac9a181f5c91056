//! Database connection settings loaded via OrthoConfig.
//!
//! Values are layered from config files, `USER_STORE_*` environment
//! variables and command-line flags. Either a full `url` is supplied, or the
//! URL is assembled from the host/port/user/password/database fields.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::outbound::persistence::PoolConfig;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_USER: &str = "postgres";
const DEFAULT_DATABASE: &str = "postgres";

/// Errors raised while turning settings into connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// An explicit URL was configured but is blank.
    #[error("database url must not be empty when provided")]
    EmptyUrl,
    /// The configured or assembled URL could not be parsed.
    #[error("invalid database url: {message}")]
    InvalidUrl { message: String },
}

/// Connection settings for the PostgreSQL backing store.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USER_STORE")]
pub struct DatabaseSettings {
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    /// Server host name.
    pub host: Option<String>,
    /// Server port.
    #[ortho_config(default = 5432)]
    pub port: u16,
    /// Role used to authenticate.
    pub user: Option<String>,
    /// Password for `user`.
    pub password: Option<String>,
    /// Database name.
    pub database: Option<String>,
    /// Upper bound on pooled connections.
    pub max_connections: Option<u32>,
    /// Connections kept open while idle.
    pub min_idle_connections: Option<u32>,
    /// Pool checkout timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: DEFAULT_PORT,
            user: None,
            password: None,
            database: None,
            max_connections: None,
            min_idle_connections: None,
            connect_timeout_secs: None,
        }
    }
}

impl DatabaseSettings {
    /// Return the configured host, falling back to `localhost`.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Return the configured role, falling back to `postgres`.
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_USER)
    }

    /// Return the configured database name, falling back to `postgres`.
    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or(DEFAULT_DATABASE)
    }

    /// Resolve the connection URL.
    ///
    /// Credentials are percent-encoded when the URL is assembled from parts.
    pub fn database_url(&self) -> Result<String, SettingsError> {
        if let Some(explicit) = self.url.as_deref() {
            if explicit.trim().is_empty() {
                return Err(SettingsError::EmptyUrl);
            }
            let parsed = Url::parse(explicit).map_err(|err| SettingsError::InvalidUrl {
                message: err.to_string(),
            })?;
            return Ok(parsed.into());
        }

        let base = format!(
            "postgresql://{}:{}/{}",
            self.host(),
            self.port(),
            self.database()
        );
        let mut url = Url::parse(&base).map_err(|err| SettingsError::InvalidUrl {
            message: err.to_string(),
        })?;
        url.set_username(self.user())
            .map_err(|()| SettingsError::InvalidUrl {
                message: "url cannot carry credentials".to_owned(),
            })?;
        if let Some(password) = self.password.as_deref() {
            url.set_password(Some(password))
                .map_err(|()| SettingsError::InvalidUrl {
                    message: "url cannot carry credentials".to_owned(),
                })?;
        }
        Ok(url.into())
    }

    /// Build a pool configuration from these settings.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let defaults = PoolConfig::new(self.database_url()?);
        Ok(PoolConfig {
            max_size: self.max_connections.unwrap_or(defaults.max_size),
            min_idle: self.min_idle_connections.or(defaults.min_idle),
            connection_timeout: self
                .connect_timeout_secs
                .map_or(defaults.connection_timeout, Duration::from_secs),
            ..defaults
        })
    }
}
