//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod database;
pub mod logging;
pub mod purchase;
pub mod session;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::purchase::PurchaseConfig;
pub use self::session::{AdmissionMode, SessionConfig};
pub use self::store::{RedisStoreConfig, StoreConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Shared capacity store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Session admission settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Purchase unit-of-work settings.
    #[serde(default)]
    pub purchase: PurchaseConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default.toml` with `config/{env}.toml` and environment
    /// variables prefixed with `FREEMARKET__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::build(&[
            "config/default".to_string(),
            format!("config/{env}"),
        ])
    }

    /// Load configuration from an explicit file, still honouring environment
    /// variable overrides.
    pub fn load_from(path: &str) -> Result<Self, AppError> {
        Self::build(&[path.to_string()])
    }

    fn build(files: &[String]) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        for file in files {
            builder = builder.add_source(config::File::with_name(file).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("FREEMARKET")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject settings the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.database.max_connections == 0
            || self.database.min_connections > self.database.max_connections
        {
            return Err(AppError::configuration(
                "database.min_connections must not exceed a non-zero database.max_connections",
            ));
        }
        if self.database.lock_timeout_seconds == 0 {
            return Err(AppError::configuration(
                "database.lock_timeout_seconds must be greater than zero",
            ));
        }
        if self.session.default_limit == 0 {
            return Err(AppError::configuration(
                "session.default_limit must be greater than zero",
            ));
        }
        if self.session.ttl_minutes == 0 {
            return Err(AppError::configuration(
                "session.ttl_minutes must be greater than zero",
            ));
        }
        if self.session.sweep_interval_seconds == 0 {
            return Err(AppError::configuration(
                "session.sweep_interval_seconds must be greater than zero",
            ));
        }
        if self.purchase.timeout_seconds == 0 {
            return Err(AppError::configuration(
                "purchase.timeout_seconds must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig {
            database: DatabaseConfig::with_url("postgres://localhost/freemarket"),
            store: StoreConfig::default(),
            session: SessionConfig::default(),
            purchase: PurchaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let mut config = base();
        config.session.default_limit = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_pool_bounds_checked() {
        let mut config = base();
        config.database.min_connections = config.database.max_connections + 1;
        assert!(config.validate().is_err());

        let mut config = base();
        config.database.lock_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_defaults() {
        let session = SessionConfig::default();
        assert_eq!(session.ttl().as_secs(), 30 * 60);
        assert_eq!(session.sweep_interval().as_secs(), 60);
        assert_eq!(session.admission_mode, AdmissionMode::Atomic);
    }
}
