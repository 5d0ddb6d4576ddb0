//! System-wide constants for the HAL manager workspace.
//!
//! Single source of truth for names, limits and default paths.

/// API name of the manager endpoint.
pub const HAL_MANAGER_API_NAME: &str = "4a-hal-manager";

/// Description of the manager endpoint.
pub const HAL_MANAGER_API_INFO: &str = "Manager for 4A HAL APIs";

/// Environment variable overriding the descriptor directory list.
pub const CONFIG_PATH_ENV: &str = "CONTROL_CONFIG_PATH";

/// Default descriptor directory.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hal_manager/config.d";

/// Default manager configuration file.
pub const DEFAULT_MANAGER_CONFIG: &str = "/etc/hal_manager/manager.toml";

/// Separator between directories in a descriptor directory list.
pub const CONFIG_PATH_SEPARATOR: char = ':';

/// File-name component marking a HAL descriptor (`hal-*.json`, `*-hal-*.json`).
pub const DESCRIPTOR_MARKER: &str = "hal";

/// Extension of HAL descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "json";

/// Default maximum number of registered HALs.
pub const MAX_HALS: usize = 64;

/// Device string reported for an unresolved card.
pub const CARD_NOT_FOUND: &str = "not-found";
