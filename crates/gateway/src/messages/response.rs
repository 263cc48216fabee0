//! Payloads routed into pending requests and the typed outcomes built from them

use serde::{Deserialize, Serialize};
use tws_core::{Bar, ContractDetails, MarketTick, OrderStatusUpdate};

use crate::error::RequestError;

/// Successful end state of a cancellation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOutcome {
    /// The gateway acknowledged the cancel
    Cancelled { message: String },
    /// The order was already filled or cancelled; nothing is working either way
    AlreadyTerminal { message: String },
}

/// Final outcome of a placed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderOutcome {
    /// Terminal status callback (Filled, Cancelled, ApiCancelled, Inactive)
    Terminal(OrderStatusUpdate),
    /// Order-cancelled acknowledgement without a status callback
    CancelAcknowledged { message: String },
}

/// One unit of data routed into a pending request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponsePayload {
    OrderStatus(OrderStatusUpdate),
    Cancellation(CancelOutcome),
    Bar(Bar),
    ContractDetails(ContractDetails),
    Tick(MarketTick),
}

impl ResponsePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderStatus(_) => "order status",
            Self::Cancellation(_) => "cancellation",
            Self::Bar(_) => "bar",
            Self::ContractDetails(_) => "contract details",
            Self::Tick(_) => "tick",
        }
    }
}

/// Value a completed request is fulfilled with
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Single-shot result
    Single(ResponsePayload),
    /// Accumulated streaming result, in delivery order
    Sequence(Vec<ResponsePayload>),
}

/// What a pending request's completion sink receives
pub type Completion = Result<Response, RequestError>;
