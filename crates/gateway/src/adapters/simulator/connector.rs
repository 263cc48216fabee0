//! Connector that spawns a simulated gateway per connection

use async_trait::async_trait;
use dashmap::DashSet;
use log::{error, info};

use super::gateway::{SimulatedGateway, SimulatorSettings};
use crate::error::TransportError;
use crate::transport::channel::channel_link;
use crate::transport::{ConnectedTransport, Connector};

/// Connects clients to in-process simulated gateways
///
/// Like the real gateway, refuses a second live connection with a client id
/// already in use.
pub struct SimulatorConnector {
    settings: SimulatorSettings,
    request_capacity: usize,
    event_capacity: usize,
    connected: std::sync::Arc<DashSet<i32>>,
}

impl SimulatorConnector {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self {
            settings,
            request_capacity: 1024,
            event_capacity: 1024,
            connected: Default::default(),
        }
    }

    pub fn with_capacities(mut self, request_capacity: usize, event_capacity: usize) -> Self {
        self.request_capacity = request_capacity;
        self.event_capacity = event_capacity;
        self
    }
}

impl Default for SimulatorConnector {
    fn default() -> Self {
        Self::new(SimulatorSettings::default())
    }
}

#[async_trait]
impl Connector for SimulatorConnector {
    async fn connect(
        &self,
        host: &str,
        port: u16,
        client_id: i32,
    ) -> Result<ConnectedTransport, TransportError> {
        if !self.connected.insert(client_id) {
            return Err(TransportError::Connection(format!(
                "client id {} already in use on {}:{}",
                client_id, host, port
            )));
        }

        let (link, end) = channel_link(self.request_capacity, self.event_capacity);
        let gateway = SimulatedGateway::new(end, self.settings.clone());
        let connected = self.connected.clone();
        tokio::spawn(async move {
            if let Err(e) = gateway.run().await {
                error!("Simulated gateway for client {} failed: {}", client_id, e);
            }
            connected.remove(&client_id);
        });

        info!("Simulated gateway {}:{} accepted client {}", host, port, client_id);
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_client_id_refused() {
        let connector = SimulatorConnector::default();
        let first = connector.connect("127.0.0.1", 4002, 7).await;
        assert!(first.is_ok());

        let second = connector.connect("127.0.0.1", 4002, 7).await;
        assert!(matches!(second, Err(TransportError::Connection(_))));

        assert!(connector.connect("127.0.0.1", 4002, 8).await.is_ok());
    }
}
