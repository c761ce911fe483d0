//! Configuration management for the mill workflow engine
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with MILL_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::PermissionMatrix;

use crate::error::{AppError, AppResult};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Database configuration, used by the postgres backend
    pub database: DatabaseConfig,

    /// Which store backs the engine
    pub storage: StorageConfig,

    /// Permission matrix source
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Log filter and format
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PermissionsConfig {
    /// JSON file replacing the built-in mill matrix
    #[serde(default)]
    pub matrix_path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,

    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("MILL_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("database.url", "postgres://localhost/mill_workflow")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("storage.backend", "memory")?
            .set_default("logging.filter", "mill_workflow=info,sqlx=warn")?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (MILL_ prefix)
            .add_source(
                Environment::with_prefix("MILL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Build the permission matrix: the configured file, or the mill default
    pub fn permission_matrix(&self) -> AppResult<PermissionMatrix> {
        match &self.permissions.matrix_path {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Configuration(format!("cannot read permission matrix {}: {}", path, e))
                })?;
                Ok(PermissionMatrix::from_json(&json)?)
            }
            None => Ok(PermissionMatrix::mill_default()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database: DatabaseConfig::default(),
            storage: StorageConfig {
                backend: StorageBackend::Memory,
            },
            permissions: PermissionsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/mill_workflow".to_string(),
            max_connections: 10,
            min_connections: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "mill_workflow=info,sqlx=warn".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Action, Resource, UserRole};

    #[test]
    fn test_default_uses_memory_store_and_mill_matrix() {
        let config = Config::default();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        let matrix = config.permission_matrix().unwrap();
        assert!(matrix.can_perform_action(UserRole::Admin, Action::Delete, Resource::SampleEntry));
    }

    #[test]
    fn test_missing_matrix_file_is_configuration_error() {
        let mut config = Config::default();
        config.permissions.matrix_path = Some("/nonexistent/matrix.json".to_string());
        assert!(matches!(
            config.permission_matrix(),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_storage_backend_names() {
        let backend: StorageBackend = serde_json::from_str("\"postgres\"").unwrap();
        assert_eq!(backend, StorageBackend::Postgres);
    }
}
