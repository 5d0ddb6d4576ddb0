//! HAL provisioning and activation.
//!
//! Provisioning is two-phase:
//! 1. `provision_one()` - Parse a descriptor, register a pending internal
//!    entry and ask the host for an endpoint
//! 2. `activate()` - Delivered once by the host after the endpoint is live:
//!    copy metadata, resolve the card, run the section executor
//!
//! # State Machine
//!
//! ```text
//! UNAVAILABLE --(card resolves)--> AVAILABLE --(executor ok)--> READY
//! ```

use hal_common::hal::collaborator::{EndpointRequest, HostError};
use hal_common::hal::descriptor::{DescriptorError, HalDescriptor};
use hal_common::hal::types::{
    HalEntry, HalHandle, HalMetadata, HalOrigin, HalStatus, InternalHal, ProvisionPhase,
};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::manager::HalManager;
use crate::registry::RegistryError;

/// Error types for provisioning operations.
#[derive(Debug, Clone, Error)]
pub enum ProvisionError {
    /// Descriptor could not be loaded.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Registry refused the entry.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Host refused the endpoint.
    #[error("Endpoint creation failed for '{api}': {source}")]
    Host {
        /// API name.
        api: String,
        /// Host error.
        #[source]
        source: HostError,
    },

    /// No live entry for the handle.
    #[error("No HAL entry for {0}")]
    UnknownHandle(HalHandle),

    /// External HALs are never activated.
    #[error("HAL '{0}' is external")]
    NotInternal(String),

    /// Activation is single-shot.
    #[error("HAL '{0}' is already activated")]
    AlreadyActivated(String),
}

impl HalManager {
    /// Provision one internal HAL from the descriptor at `path`.
    ///
    /// On success the entry is registered as pending and the host has been
    /// asked for its endpoint. On failure nothing stays registered.
    pub fn provision_one(&mut self, path: &Path) -> Result<HalHandle, ProvisionError> {
        let descriptor = HalDescriptor::load(path)?;
        let api = descriptor.api().to_string();
        let info = descriptor.metadata.info.clone();

        let handle = self.registry.add(HalEntry::internal(descriptor))?;

        let request = EndpointRequest {
            api: api.clone(),
            info,
            handle,
        };
        if let Err(source) = self.host.create_endpoint(request) {
            // `remove` protects internal entries; the pending one is rolled back here
            self.registry.discard(handle);
            return Err(ProvisionError::Host { api, source });
        }

        info!("Provisioned HAL '{}' from {:?} ({})", api, path, handle);
        Ok(handle)
    }

    /// Activate the internal HAL behind `handle`.
    ///
    /// Returns the resulting status. Resolution is not retried: a card
    /// missing now stays `Unavailable` until restart.
    pub fn activate(&mut self, handle: HalHandle) -> Result<HalStatus, ProvisionError> {
        let entry = self
            .registry
            .get_mut(handle)
            .ok_or(ProvisionError::UnknownHandle(handle))?;

        let internal: &mut InternalHal = match &mut entry.origin {
            HalOrigin::Internal(data) => data.as_mut(),
            HalOrigin::External => return Err(ProvisionError::NotInternal(entry.api_name.clone())),
        };
        if internal.phase == ProvisionPhase::Activated {
            return Err(ProvisionError::AlreadyActivated(entry.api_name.clone()));
        }
        internal.phase = ProvisionPhase::Activated;

        let meta = &internal.descriptor.metadata;
        entry.metadata = HalMetadata {
            uid: Some(internal.descriptor.unique_id()),
            info: meta.info.clone(),
            author: meta.author.clone(),
            version: meta.version.clone(),
            date: meta.date.clone(),
        };

        match self.resolver.resolve(&entry.snd_card_path) {
            Ok(card_id) => {
                entry.snd_card_id = Some(card_id);
                entry.status = HalStatus::Available;
                debug!("HAL '{}' bound to card {}", entry.api_name, card_id);
            }
            Err(e) => {
                entry.snd_card_id = None;
                entry.status = HalStatus::Unavailable;
                warn!("HAL '{}' unavailable: {}", entry.api_name, e);
            }
        }

        match self
            .executor
            .execute(&internal.descriptor, &mut internal.extended)
        {
            Ok(()) if entry.status == HalStatus::Available => entry.status = HalStatus::Ready,
            Ok(()) => {}
            Err(e) => warn!("HAL '{}' configuration failed: {}", entry.api_name, e),
        }

        info!("HAL '{}' activated: {}", entry.api_name, entry.status);
        Ok(entry.status)
    }
}
