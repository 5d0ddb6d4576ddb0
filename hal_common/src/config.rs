//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! for the HAL manager, plus the resolution of the descriptor directory list.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hal_common::config::{ConfigError, HalManagerConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = HalManagerConfig::load_or_default(Path::new("manager.toml"))?;
//!     println!("Manager API: {}", config.manager.api_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, HAL_MANAGER_API_INFO, HAL_MANAGER_API_NAME, MAX_HALS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// configuration files.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Represents the verbosity level of logging output.
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields shared by every service.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "4a-hal-manager"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: HAL_MANAGER_API_NAME.to_string(),
        }
    }
}

fn default_api_name() -> String {
    HAL_MANAGER_API_NAME.to_string()
}

fn default_api_info() -> String {
    HAL_MANAGER_API_INFO.to_string()
}

fn default_max_hals() -> usize {
    MAX_HALS
}

/// `[manager]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerSection {
    /// API name of the manager endpoint.
    #[serde(default = "default_api_name")]
    pub api_name: String,

    /// Description of the manager endpoint.
    #[serde(default = "default_api_info")]
    pub info: String,

    /// Descriptor directory list (`:`-separated). Overridden by the
    /// `CONTROL_CONFIG_PATH` environment variable.
    #[serde(default)]
    pub config_path: Option<String>,

    /// Maximum number of registered HALs.
    #[serde(default = "default_max_hals")]
    pub max_hals: usize,
}

impl Default for ManagerSection {
    fn default() -> Self {
        Self {
            api_name: default_api_name(),
            info: default_api_info(),
            config_path: None,
            max_hals: default_max_hals(),
        }
    }
}

/// Manager configuration loaded from `manager.toml`.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "4a-hal-manager"
///
/// [manager]
/// config_path = "/etc/hal_manager/config.d:/usr/share/hal_manager"
/// max_hals = 32
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HalManagerConfig {
    /// Shared service fields.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Manager fields.
    #[serde(default)]
    pub manager: ManagerSection,
}

impl HalManagerConfig {
    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// 1. `shared.service_name` not empty
    /// 2. `manager.api_name` not empty
    /// 3. `manager.max_hals` > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.manager.api_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "manager.api_name cannot be empty".to_string(),
            ));
        }

        if self.manager.max_hals == 0 {
            return Err(ConfigError::ValidationError(
                "manager.max_hals must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load and validate `path`, falling back to defaults when the file does
    /// not exist.
    ///
    /// # Errors
    /// Parse and validation errors are returned; a missing file is not an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let config = match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::FileNotFound) => {
                warn!("No manager config at {:?}, using built-in defaults", path);
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.validate()?;
        Ok(config)
    }

    /// Descriptor directory list to scan.
    ///
    /// Precedence: `cli_override` > `CONTROL_CONFIG_PATH` > `manager.config_path`
    /// > built-in default.
    pub fn descriptor_path(&self, cli_override: Option<&str>) -> String {
        let env_value = std::env::var(CONFIG_PATH_ENV).ok();
        resolve_descriptor_path(
            cli_override,
            env_value.as_deref(),
            self.manager.config_path.as_deref(),
        )
    }
}

/// Pick the descriptor directory list from its possible sources.
///
/// Empty values are treated as absent.
pub fn resolve_descriptor_path(
    cli_override: Option<&str>,
    env_value: Option<&str>,
    configured: Option<&str>,
) -> String {
    [cli_override, env_value, configured]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .unwrap_or(DEFAULT_CONFIG_PATH)
        .to_string()
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"")
                .unwrap()
                .level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"warn\"")
                .unwrap()
                .level,
            LogLevel::Warn
        );
    }

    #[test]
    fn test_log_level_to_tracing_level() {
        assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_manager_config_defaults() {
        let config = HalManagerConfig::default();
        assert_eq!(config.manager.api_name, HAL_MANAGER_API_NAME);
        assert_eq!(config.manager.info, HAL_MANAGER_API_INFO);
        assert_eq!(config.manager.max_hals, MAX_HALS);
        assert!(config.manager.config_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_manager_config_load() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
log_level = "debug"
service_name = "hal-test"

[manager]
config_path = "/tmp/a:/tmp/b"
max_hals = 8
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = HalManagerConfig::load_or_default(file.path()).unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.shared.service_name, "hal-test");
        assert_eq!(config.manager.config_path.as_deref(), Some("/tmp/a:/tmp/b"));
        assert_eq!(config.manager.max_hals, 8);
        assert_eq!(config.manager.api_name, HAL_MANAGER_API_NAME);
    }

    #[test]
    fn test_manager_config_missing_file_uses_defaults() {
        let config =
            HalManagerConfig::load_or_default(Path::new("/nonexistent/manager.toml")).unwrap();
        assert_eq!(config.manager.max_hals, MAX_HALS);
    }

    #[test]
    fn test_manager_config_rejects_zero_capacity() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[manager]\nmax_hals = 0\n").unwrap();
        file.flush().unwrap();

        let result = HalManagerConfig::load_or_default(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_manager_config_unknown_field_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[manager]\nbogus = 1\n").unwrap();
        file.flush().unwrap();

        let result = HalManagerConfig::load_or_default(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_descriptor_path_precedence() {
        assert_eq!(
            resolve_descriptor_path(Some("/cli"), Some("/env"), Some("/cfg")),
            "/cli"
        );
        assert_eq!(
            resolve_descriptor_path(None, Some("/env"), Some("/cfg")),
            "/env"
        );
        assert_eq!(resolve_descriptor_path(None, Some(""), Some("/cfg")), "/cfg");
        assert_eq!(
            resolve_descriptor_path(None, None, None),
            DEFAULT_CONFIG_PATH
        );
    }
}
