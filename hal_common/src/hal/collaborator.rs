//! Collaborator traits and error types.
//!
//! The HAL manager delegates three concerns to pluggable collaborators:
//! - `CardResolver` - Maps a sound card path to a numeric card id
//! - `SectionExecutor` - Interprets the declarative sections of a descriptor
//! - `EndpointHost` - Exposes a dynamically dispatched endpoint per HAL
//!
//! Each trait has a built-in implementation in `hal_manager`; hosts embedding
//! the manager can substitute their own.

use crate::hal::descriptor::HalDescriptor;
use crate::hal::types::{ExtendedData, HalHandle};
use thiserror::Error;

/// Card resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No card matches the path.
    #[error("Sound card not found: {0}")]
    NotFound(String),

    /// The path is not in a recognised form.
    #[error("Unsupported sound card path: {0}")]
    Unsupported(String),
}

/// Section execution failed fatally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    /// A section has an invalid shape.
    #[error("Invalid section '{section}': {reason}")]
    InvalidSection {
        /// Section key.
        section: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Applying a section failed.
    #[error("Section '{section}' failed: {reason}")]
    Failed {
        /// Section key.
        section: String,
        /// Failure text.
        reason: String,
    },
}

/// Endpoint creation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// An endpoint with this name already exists on the host.
    #[error("Endpoint already exists: {0}")]
    AlreadyExists(String),

    /// The host can no longer accept endpoints (e.g. shutting down).
    #[error("Host unavailable: {0}")]
    Unavailable(String),
}

/// Request to expose a new HAL endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRequest {
    /// Endpoint (API) name.
    pub api: String,
    /// Endpoint description.
    pub info: Option<String>,
    /// Registry entry the endpoint is bound to.
    pub handle: HalHandle,
}

/// Maps a sound card path to its numeric id.
pub trait CardResolver: Send {
    /// Resolve `path` to a card id.
    ///
    /// # Errors
    /// `ResolveError::NotFound` when no card matches. Implementations do not
    /// retry; a card missing at activation stays unavailable.
    fn resolve(&self, path: &str) -> Result<u32, ResolveError>;
}

/// Interprets the declarative sections of a descriptor.
pub trait SectionExecutor: Send {
    /// Apply every section of `descriptor`, recording mixer and control
    /// data into `extended`.
    ///
    /// # Errors
    /// Returns `ExecError` only for fatal failures; the HAL then stays
    /// below `Ready`.
    fn execute(
        &self,
        descriptor: &HalDescriptor,
        extended: &mut ExtendedData,
    ) -> Result<(), ExecError>;
}

/// Host side of dynamic endpoint creation.
///
/// # Lifecycle
///
/// 1. `create_endpoint()` - Called by the provisioner for every descriptor
/// 2. Once the endpoint is live, the host schedules exactly one activation
///    for `request.handle` (see `hal_manager::manager::ManagerMessage`)
pub trait EndpointHost: Send {
    /// Create the endpoint described by `request`.
    fn create_endpoint(&self, request: EndpointRequest) -> Result<(), HostError>;
}
