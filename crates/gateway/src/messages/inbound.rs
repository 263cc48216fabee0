//! Callback events delivered by the transport

use serde::{Deserialize, Serialize};
use tws_core::{Bar, ContractDetails, MarketTick, OrderStatusUpdate, RequestId};

/// Typed callback from the gateway
///
/// Each event carries the correlation id the gateway embedded, where the protocol
/// provides one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatewayEvent {
    /// Lowest order id the gateway will accept from this client
    NextValidId(RequestId),
    OrderStatus(OrderStatusUpdate),
    HistoricalBar {
        request_id: RequestId,
        bar: Bar,
    },
    HistoricalDataEnd {
        request_id: RequestId,
    },
    ContractDetails {
        request_id: RequestId,
        details: ContractDetails,
    },
    ContractDetailsEnd {
        request_id: RequestId,
    },
    Tick {
        request_id: RequestId,
        tick: MarketTick,
    },
    Error {
        /// `None` for global (connection-level) errors
        request_id: Option<RequestId>,
        code: i32,
        message: String,
    },
    /// The transport dropped the connection
    ConnectionClosed {
        reason: String,
    },
}

impl GatewayEvent {
    /// Build an error event from a raw wire id (`-1` means no request)
    pub fn error(raw_id: i64, code: i32, message: impl Into<String>) -> Self {
        Self::Error {
            request_id: RequestId::from_wire(raw_id),
            code,
            message: message.into(),
        }
    }

    /// The correlation id carried by this event, if any
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::OrderStatus(update) => Some(update.order_id),
            Self::HistoricalBar { request_id, .. }
            | Self::HistoricalDataEnd { request_id }
            | Self::ContractDetails { request_id, .. }
            | Self::ContractDetailsEnd { request_id }
            | Self::Tick { request_id, .. } => Some(*request_id),
            Self::Error { request_id, .. } => *request_id,
            Self::NextValidId(_) | Self::ConnectionClosed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_error_has_no_id() {
        let event = GatewayEvent::error(-1, 2104, "Market data farm connection is OK");
        assert_eq!(event.request_id(), None);

        let event = GatewayEvent::error(12, 200, "No security definition has been found");
        assert_eq!(event.request_id(), Some(RequestId::new(12)));
    }
}
