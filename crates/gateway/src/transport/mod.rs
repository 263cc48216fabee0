//! Transport abstraction layer
//!
//! The raw socket and the byte-level framing belong to the vendor connection
//! library. This layer only needs two capabilities from it: send an encoded
//! request, and deliver typed callback events in receipt order.
//!
//! The in-process [`channel`] implementation backs tests and the simulator; a
//! socket-backed implementation plugs in through the same traits.

pub mod channel;

use std::sync::Arc;

use crate::error::TransportError;
use crate::messages::{GatewayEvent, OutboundMessage};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Sends encoded requests to the gateway
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one encoded request
    async fn send(&self, msg: &OutboundMessage) -> Result<(), TransportError>;

    /// Transport name for logging
    fn name(&self) -> &str {
        "Transport"
    }
}

/// An established link: the send half and the ordered callback stream
pub struct ConnectedTransport {
    pub transport: Arc<dyn Transport>,
    pub events: mpsc::Receiver<GatewayEvent>,
}

/// Establishes connections to a gateway
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        host: &str,
        port: u16,
        client_id: i32,
    ) -> Result<ConnectedTransport, TransportError>;
}
