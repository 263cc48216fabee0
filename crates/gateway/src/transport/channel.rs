//! Tokio channel-based transport for single-process mode
//!
//! Requests flow through a bounded mpsc channel to whoever holds the
//! [`ChannelGatewayEnd`]; callback events flow back through a second channel,
//! preserving the order they were emitted in.

use std::sync::Arc;

use crate::error::TransportError;
use crate::messages::{GatewayEvent, OutboundMessage};
use crate::transport::{ConnectedTransport, Transport};
use async_trait::async_trait;
use log::debug;
use tokio::sync::mpsc;

/// Client side of a channel link
pub struct ChannelTransport {
    tx: mpsc::Sender<OutboundMessage>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, msg: &OutboundMessage) -> Result<(), TransportError> {
        debug!("Sending {} for request {}", msg.name(), msg.request_id());
        self.tx
            .send(msg.clone())
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn name(&self) -> &str {
        "ChannelTransport"
    }
}

/// Gateway side of a channel link
pub struct ChannelGatewayEnd {
    requests: mpsc::Receiver<OutboundMessage>,
    events: mpsc::Sender<GatewayEvent>,
}

impl ChannelGatewayEnd {
    /// Receive the next request sent by the client
    pub async fn next_request(&mut self) -> Option<OutboundMessage> {
        self.requests.recv().await
    }

    /// Try to receive a request without waiting
    pub fn try_next_request(&mut self) -> Option<OutboundMessage> {
        self.requests.try_recv().ok()
    }

    /// Deliver a callback event to the client
    pub async fn emit(&self, event: GatewayEvent) -> Result<(), TransportError> {
        self.events
            .send(event)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Another handle for emitting events
    pub fn event_sender(&self) -> mpsc::Sender<GatewayEvent> {
        self.events.clone()
    }
}

/// Create a connected client/gateway channel pair
pub fn channel_link(
    request_capacity: usize,
    event_capacity: usize,
) -> (ConnectedTransport, ChannelGatewayEnd) {
    let (request_tx, request_rx) = mpsc::channel(request_capacity);
    let (event_tx, event_rx) = mpsc::channel(event_capacity);

    let client = ConnectedTransport {
        transport: Arc::new(ChannelTransport { tx: request_tx }),
        events: event_rx,
    };
    let gateway = ChannelGatewayEnd {
        requests: request_rx,
        events: event_tx,
    };
    (client, gateway)
}
