//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use hal_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use hal_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, HalManagerConfig, ManagerSection, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CARD_NOT_FOUND, HAL_MANAGER_API_NAME, MAX_HALS};

// ─── HAL Types ──────────────────────────────────────────────────────
pub use crate::hal::descriptor::{DescriptorError, HalDescriptor};
pub use crate::hal::types::{
    ExtendedData, HalEntry, HalHandle, HalMetadata, HalOrigin, HalStatus, ProvisionPhase,
};

// ─── Collaborators ──────────────────────────────────────────────────
pub use crate::hal::collaborator::{
    CardResolver, EndpointHost, EndpointRequest, ExecError, HostError, ResolveError,
    SectionExecutor,
};
