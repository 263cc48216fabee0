//! Events forwarded to the general-purpose listener

use tws_core::{OrderStatusUpdate, RequestId};

use crate::classifier::ErrorClass;

/// Notification that does not complete any pending request
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// The id counter was advanced to the gateway's next valid id
    NextValidId(RequestId),
    /// Non-terminal order status, or a status for an order nobody awaits
    OrderStatus(OrderStatusUpdate),
    /// Error that was not (or could no longer be) routed to a pending request
    Error {
        request_id: Option<RequestId>,
        code: i32,
        message: String,
        class: ErrorClass,
    },
    /// All outstanding requests were failed with `ConnectionLost`
    ConnectionLost { reason: String, failed: usize },
}
