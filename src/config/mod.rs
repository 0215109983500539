//! Application configuration module
//!
//! Configuration is read from environment variables with the `CALLFLOW`
//! prefix; nested values are separated by a double underscore. A `.env`
//! file is honoured in development.
//!
//! # Example
//!
//! ```no_run
//! use callflow::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod server;
mod telephony;
mod trees;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};
pub use telephony::TelephonyConfig;
pub use trees::TreesConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection; calls are kept in memory when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    /// Provider account and outbound defaults
    pub telephony: TelephonyConfig,

    #[serde(default)]
    pub trees: TreesConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// - `CALLFLOW__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `CALLFLOW__TELEPHONY__ACCOUNT_SID=AC...` -> `telephony.account_sid`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CALLFLOW")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// Production additionally requires an HTTPS public host and a database.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        match &self.database {
            Some(database) => database.validate()?,
            None if self.is_production() => {
                return Err(ValidationError::MissingRequired("DATABASE__URL"));
            }
            None => {}
        }
        self.telephony.validate(self.is_production())?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "CALLFLOW__TELEPHONY__ACCOUNT_SID",
        "CALLFLOW__TELEPHONY__AUTH_TOKEN",
        "CALLFLOW__TELEPHONY__PUBLIC_HOST",
        "CALLFLOW__TELEPHONY__DEFAULT_OUTGOING_NUMBER",
        "CALLFLOW__TELEPHONY__ATTACH_RECORDINGS",
        "CALLFLOW__DATABASE__URL",
        "CALLFLOW__SERVER__PORT",
        "CALLFLOW__SERVER__ENVIRONMENT",
        "CALLFLOW__TREES__DIR",
    ];

    fn set_minimal_env() {
        env::set_var("CALLFLOW__TELEPHONY__ACCOUNT_SID", "AC123");
        env::set_var("CALLFLOW__TELEPHONY__AUTH_TOKEN", "secret");
        env::set_var("CALLFLOW__TELEPHONY__PUBLIC_HOST", "https://ivr.example.com");
        env::set_var("CALLFLOW__TELEPHONY__DEFAULT_OUTGOING_NUMBER", "+16135550000");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config loads");
        assert_eq!(config.telephony.account_sid, "AC123");
        assert_eq!(config.telephony.api_base_url, "https://api.twilio.com");
        assert!(config.telephony.attach_recordings);
        assert!(config.database.is_none());
        assert_eq!(config.trees.dir, std::path::PathBuf::from("trees"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_telephony_section_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        assert!(AppConfig::load().is_err());
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CALLFLOW__SERVER__PORT", "3000");
        env::set_var("CALLFLOW__TELEPHONY__ATTACH_RECORDINGS", "false");
        env::set_var("CALLFLOW__TREES__DIR", "/etc/callflow/trees");
        env::set_var("CALLFLOW__DATABASE__URL", "postgresql://test@localhost/test");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config loads");
        assert_eq!(config.server.port, 3000);
        assert!(!config.telephony.attach_recordings);
        assert_eq!(config.trees.dir, std::path::PathBuf::from("/etc/callflow/trees"));
        let database = config.database.expect("database section");
        assert_eq!(database.url, "postgresql://test@localhost/test");
        assert_eq!(database.max_connections, 10);
    }

    #[test]
    fn test_production_requires_database() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("CALLFLOW__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load();
        clear_env();

        let config = result.expect("config loads");
        assert!(config.is_production());
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("DATABASE__URL"))
        ));
    }
}
