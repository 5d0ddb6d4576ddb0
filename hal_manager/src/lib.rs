//! # HAL Manager Library
//!
//! Registry of audio HAL endpoints and dynamic provisioning of internal HALs
//! from `hal-*.json` descriptors.
//!
//! # Module Structure
//!
//! - [`registry`] - Handle-based HAL registry
//! - [`manager`] - HalManager context, message task and handle
//! - [`handlers`] - Manager verbs and wire responses
//! - [`provisioner`] - Descriptor provisioning and activation
//! - [`loader`] - Descriptor discovery and batch provisioning
//! - [`resolver`] - Sound card path resolution
//! - [`executor`] - Declarative section execution
//! - [`host`] - In-process endpoint host
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        hal_manager                               │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │  Callers    │───►│  HalManager  │◄──►│  HalRegistry        │  │
//! │  │ (requests)  │    │  (task)      │    │                     │  │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                            │                                     │
//! │          ┌─────────────────┼──────────────────┐                  │
//! │          ▼                 ▼                  ▼                  │
//! │  ┌──────────────┐  ┌───────────────┐  ┌────────────────┐         │
//! │  │ EndpointHost │  │ CardResolver  │  │ SectionExecutor│         │
//! │  └──────┬───────┘  └───────────────┘  └────────────────┘         │
//! │         │ Activate(handle)                                       │
//! │         └──────────────► HalManager                              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod executor;
pub mod handlers;
pub mod host;
pub mod loader;
pub mod manager;
pub mod provisioner;
pub mod registry;
pub mod resolver;

// Re-export key types for convenience
pub use crate::handlers::{LoadedReply, RequestError, Response};
pub use crate::host::LocalHost;
pub use crate::loader::ProvisionReport;
pub use crate::manager::{channel, HalManager, ManagerHandle, ManagerMessage, WeakManagerHandle};
pub use crate::provisioner::ProvisionError;
pub use crate::registry::{HalRegistry, RegistryError};
