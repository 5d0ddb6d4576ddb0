//! HAL manager context and task.
//!
//! The `HalManager` struct is the main entry point for HAL operations. It owns
//! the registry and the collaborators, and is driven by a single task that
//! handles one `ManagerMessage` at a time, so every handler and activation
//! sees the registry without concurrent mutation.

use hal_common::config::ManagerSection;
use hal_common::hal::collaborator::{CardResolver, EndpointHost, SectionExecutor};
use hal_common::hal::types::HalHandle;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::executor::DeclarativeExecutor;
use crate::handlers::Response;
use crate::registry::HalRegistry;
use crate::resolver::AlsaCardResolver;

/// Messages processed by the manager task.
#[derive(Debug)]
pub enum ManagerMessage {
    /// Caller request for one of the manager verbs.
    Request {
        /// Verb name (`ping`, `loaded`, `load`, ...).
        verb: String,
        /// JSON arguments (`Value::Null` when none).
        args: Value,
        /// Where the response goes.
        reply: oneshot::Sender<Response>,
    },
    /// The host brought the endpoint of `HalHandle` up.
    Activate(HalHandle),
    /// Stop the task and tear the registry down.
    Shutdown,
}

/// Error returned to callers of a `ManagerHandle`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
    /// The manager task is gone.
    #[error("HAL manager is not running")]
    Stopped,
}

/// Cloneable sender side of the manager task.
#[derive(Debug, Clone)]
pub struct ManagerHandle {
    tx: mpsc::UnboundedSender<ManagerMessage>,
}

impl ManagerHandle {
    /// Send a request and wait for its response.
    pub async fn request(&self, verb: &str, args: Value) -> Result<Response, ManagerError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(ManagerMessage::Request {
                verb: verb.to_string(),
                args,
                reply,
            })
            .map_err(|_| ManagerError::Stopped)?;
        response.await.map_err(|_| ManagerError::Stopped)
    }

    /// Ask the manager task to stop.
    pub fn shutdown(&self) -> Result<(), ManagerError> {
        self.tx
            .send(ManagerMessage::Shutdown)
            .map_err(|_| ManagerError::Stopped)
    }

    /// Handle that does not keep the manager task alive.
    pub fn downgrade(&self) -> WeakManagerHandle {
        WeakManagerHandle {
            tx: self.tx.downgrade(),
        }
    }
}

/// Non-owning handle held by collaborators the manager itself owns.
///
/// The task stops once every `ManagerHandle` is gone, whatever the number of
/// weak handles left.
#[derive(Debug, Clone)]
pub struct WeakManagerHandle {
    tx: mpsc::WeakUnboundedSender<ManagerMessage>,
}

impl WeakManagerHandle {
    /// Schedule the activation of a freshly created endpoint.
    pub fn activate(&self, handle: HalHandle) -> Result<(), ManagerError> {
        self.tx
            .upgrade()
            .ok_or(ManagerError::Stopped)?
            .send(ManagerMessage::Activate(handle))
            .map_err(|_| ManagerError::Stopped)
    }
}

/// Create the manager channel.
pub fn channel() -> (ManagerHandle, mpsc::UnboundedReceiver<ManagerMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ManagerHandle { tx }, rx)
}

/// HAL manager context: registry plus collaborators.
pub struct HalManager {
    /// API name of the manager endpoint
    api_name: String,
    /// Manager endpoint description
    info: String,
    /// Every known HAL
    pub(crate) registry: HalRegistry,
    /// Ping counter
    pub(crate) ping_count: u64,
    /// Endpoint creation
    pub(crate) host: Box<dyn EndpointHost>,
    /// Card path resolution
    pub(crate) resolver: Box<dyn CardResolver>,
    /// Declarative section execution
    pub(crate) executor: Box<dyn SectionExecutor>,
}

impl HalManager {
    /// Create a manager with explicit collaborators.
    pub fn new(
        config: &ManagerSection,
        host: Box<dyn EndpointHost>,
        resolver: Box<dyn CardResolver>,
        executor: Box<dyn SectionExecutor>,
    ) -> Self {
        info!(
            "HalManager '{}' created (max {} HALs)",
            config.api_name, config.max_hals
        );

        Self {
            api_name: config.api_name.clone(),
            info: config.info.clone(),
            registry: HalRegistry::with_limit(config.max_hals),
            ping_count: 0,
            host,
            resolver,
            executor,
        }
    }

    /// Create a manager using the built-in resolver and executor.
    pub fn with_defaults(config: &ManagerSection, host: Box<dyn EndpointHost>) -> Self {
        Self::new(
            config,
            host,
            Box::new(AlsaCardResolver::new()),
            Box::new(DeclarativeExecutor::new()),
        )
    }

    /// API name of the manager endpoint.
    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    /// Description of the manager endpoint.
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Read access to the registry.
    pub fn registry(&self) -> &HalRegistry {
        &self.registry
    }

    /// Handle one message. Returns `false` once the task should stop.
    pub fn handle_message(&mut self, message: ManagerMessage) -> bool {
        match message {
            ManagerMessage::Request { verb, args, reply } => {
                let response = self.dispatch(&verb, args);
                if reply.send(response).is_err() {
                    debug!("Caller of '{}' went away before the reply", verb);
                }
                true
            }
            ManagerMessage::Activate(handle) => {
                if let Err(e) = self.activate(handle) {
                    warn!("Activation of {} rejected: {}", handle, e);
                }
                true
            }
            ManagerMessage::Shutdown => false,
        }
    }

    /// Process messages until `Shutdown` or until every `ManagerHandle` is
    /// dropped, then release the registry.
    ///
    /// Returns the number of HALs released at teardown.
    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ManagerMessage>) -> usize {
        info!("HalManager '{}' running", self.api_name);

        while let Some(message) = rx.recv().await {
            if !self.handle_message(message) {
                info!("Shutdown requested");
                break;
            }
        }

        self.teardown()
    }

    /// Release every HAL, internal ones included.
    pub fn teardown(&mut self) -> usize {
        let released = self.registry.clear();
        info!("HalManager '{}' released {} HAL(s)", self.api_name, released);
        released
    }
}
