//! Message types crossing the gateway boundary
//!
//! - `outbound`: encoded requests handed to the transport
//! - `inbound`: typed callback events delivered by the transport
//! - `response`: payloads routed into pending requests and the outcomes callers see
//! - `notification`: events forwarded to the general listener

pub mod inbound;
pub mod notification;
pub mod outbound;
pub mod response;

pub use inbound::GatewayEvent;
pub use notification::Notification;
pub use outbound::{EncodedContract, EncodedOrder, OutboundMessage};
pub use response::{CancelOutcome, Completion, OrderOutcome, Response, ResponsePayload};
