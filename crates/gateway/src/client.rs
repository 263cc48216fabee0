//! Connection-scoped client
//!
//! Owns everything that lives for one gateway connection: the id generator,
//! the pending-request registry, the dispatcher task and the controller.

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::classifier::ErrorClassifier;
use crate::config::GatewayConfig;
use crate::controller::Controller;
use crate::dispatcher::CallbackDispatcher;
use crate::error::{GatewayError, RequestError};
use crate::messages::Notification;
use crate::registry::{PendingRequestRegistry, RequestInfo};
use crate::request_id::RequestIdGenerator;
use crate::transport::{ConnectedTransport, Connector};

/// A live gateway connection
///
/// Dropping the client tears the connection down like [`disconnect`](Self::disconnect):
/// outstanding handles observe `ConnectionLost`.
pub struct GatewayClient {
    config: GatewayConfig,
    controller: Controller,
    registry: Arc<PendingRequestRegistry>,
    ids: Arc<RequestIdGenerator>,
    notifications: broadcast::Sender<Notification>,
    dispatcher: Option<JoinHandle<()>>,
}

impl GatewayClient {
    /// Validate `config`, connect through `connector` and start dispatching
    pub async fn connect(
        config: GatewayConfig,
        connector: &dyn Connector,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        info!(
            "Connecting to {}:{} as client {}",
            config.host, config.port, config.client_id
        );
        let link = connector
            .connect(&config.host, config.port, config.client_id)
            .await?;
        Self::from_transport(config, link)
    }

    /// Start a client over an already established transport
    ///
    /// Must be called within a tokio runtime. Fails if `config` is invalid.
    pub fn from_transport(
        config: GatewayConfig,
        link: ConnectedTransport,
    ) -> Result<Self, GatewayError> {
        Self::with_classifier(config, link, ErrorClassifier::new())
    }

    pub fn with_classifier(
        config: GatewayConfig,
        link: ConnectedTransport,
        classifier: ErrorClassifier,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        let ConnectedTransport { transport, events } = link;

        let ids = Arc::new(RequestIdGenerator::new());
        let registry = Arc::new(PendingRequestRegistry::new());
        let (notifications, _) = broadcast::channel(config.notification_capacity);

        let dispatcher = CallbackDispatcher::new(
            registry.clone(),
            ids.clone(),
            classifier,
            notifications.clone(),
        );
        let task = tokio::spawn(dispatcher.run(events));

        info!("Gateway client {} ready over {}", config.client_id, transport.name());

        let controller = Controller::new(
            ids.clone(),
            registry.clone(),
            transport,
            config.request_timeout(),
        );

        Ok(Self {
            config,
            controller,
            registry,
            ids,
            notifications,
            dispatcher: Some(task),
        })
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Events that complete no request
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Outstanding requests, ordered by id
    pub fn pending(&self) -> Vec<RequestInfo> {
        self.registry.snapshot()
    }

    pub fn registry(&self) -> &Arc<PendingRequestRegistry> {
        &self.registry
    }

    pub fn ids(&self) -> &Arc<RequestIdGenerator> {
        &self.ids
    }

    pub fn is_connected(&self) -> bool {
        !self.registry.is_closed()
    }

    /// Fail every outstanding request with `ConnectionLost` and stop dispatching
    ///
    /// Returns the number of requests failed.
    pub async fn disconnect(&mut self) -> usize {
        let failed = self
            .registry
            .close(RequestError::connection_lost("client disconnected"));
        if let Some(task) = self.dispatcher.take() {
            task.abort();
            let _ = task.await;
        }
        info!("Gateway client {} disconnected ({} requests failed)", self.config.client_id, failed);
        failed
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        if let Some(task) = self.dispatcher.take() {
            let failed = self
                .registry
                .close(RequestError::connection_lost("client dropped"));
            task.abort();
            debug!("Gateway client {} dropped ({} requests failed)", self.config.client_id, failed);
        }
    }
}
