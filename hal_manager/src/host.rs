//! Built-in endpoint host.
//!
//! `LocalHost` keeps the set of HAL endpoints exposed by this process and
//! brings each one up by scheduling its activation on the manager task.

use hal_common::hal::collaborator::{EndpointHost, EndpointRequest, HostError};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::manager::{ManagerHandle, WeakManagerHandle};

/// In-process endpoint host.
#[derive(Debug, Clone)]
pub struct LocalHost {
    manager: WeakManagerHandle,
    endpoints: Arc<Mutex<BTreeSet<String>>>,
}

impl LocalHost {
    /// Host posting activations to `manager`. Only a weak handle is kept,
    /// so the host never keeps the manager task alive.
    pub fn new(manager: &ManagerHandle) -> Self {
        Self {
            manager: manager.downgrade(),
            endpoints: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    /// Names of the endpoints created so far.
    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl EndpointHost for LocalHost {
    fn create_endpoint(&self, request: EndpointRequest) -> Result<(), HostError> {
        let mut endpoints = self
            .endpoints
            .lock()
            .map_err(|_| HostError::Unavailable("endpoint table poisoned".to_string()))?;

        if endpoints.contains(&request.api) {
            return Err(HostError::AlreadyExists(request.api));
        }

        self.manager
            .activate(request.handle)
            .map_err(|e| HostError::Unavailable(e.to_string()))?;
        endpoints.insert(request.api.clone());

        info!(
            "Endpoint '{}' created ({})",
            request.api,
            request.info.as_deref().unwrap_or("no description")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{channel, ManagerMessage};
    use hal_common::hal::types::HalHandle;

    fn request(api: &str, index: usize) -> EndpointRequest {
        EndpointRequest {
            api: api.to_string(),
            info: None,
            handle: HalHandle::new(index, 0),
        }
    }

    #[test]
    fn test_create_endpoint_schedules_activation() {
        let (handle, mut rx) = channel();
        let host = LocalHost::new(&handle);

        host.create_endpoint(request("4a-hal-intel", 0)).unwrap();

        assert_eq!(host.endpoints(), vec!["4a-hal-intel".to_string()]);
        match rx.try_recv() {
            Ok(ManagerMessage::Activate(h)) => assert_eq!(h, HalHandle::new(0, 0)),
            other => panic!("expected activation, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_endpoint_rejected() {
        let (handle, _rx) = channel();
        let host = LocalHost::new(&handle);

        host.create_endpoint(request("dup", 0)).unwrap();
        let result = host.create_endpoint(request("dup", 1));
        assert_eq!(result, Err(HostError::AlreadyExists("dup".to_string())));
    }

    #[test]
    fn test_closed_manager_is_unavailable() {
        let (handle, rx) = channel();
        drop(rx);
        let host = LocalHost::new(&handle);

        let result = host.create_endpoint(request("late", 0));
        assert!(matches!(result, Err(HostError::Unavailable(_))));
        assert!(host.endpoints().is_empty());
    }

    #[test]
    fn test_host_does_not_keep_manager_alive() {
        let (handle, mut rx) = channel();
        let host = LocalHost::new(&handle);
        drop(handle);

        assert!(matches!(
            host.create_endpoint(request("orphan", 0)),
            Err(HostError::Unavailable(_))
        ));
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
