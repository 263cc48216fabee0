//! TWS Gateway
//!
//! Request/response correlation over an asynchronous, callback-driven broker
//! gateway. The gateway answers every request through callbacks that carry
//! only the request id; this crate turns that into awaitable, typed results.
//!
//! ## Architecture
//!
//! ```text
//!   caller
//!     │ place_order / cancel_order / request_historical_data / ...
//! ┌───▼────────┐  allocate id   ┌────────────────────┐
//! │ Controller │───────────────►│ RequestIdGenerator │
//! │            │  register      ┌────────────────────────┐
//! │            │───────────────►│ PendingRequestRegistry │◄──┐ append / resolve / fail
//! └───┬────────┘                └────────────────────────┘   │
//!     │ send                                                 │
//! ┌───▼───────┐   GatewayEvent   ┌────────────────────┐      │
//! │ Transport │─────────────────►│ CallbackDispatcher │──────┘
//! └───────────┘                  └─────────┬──────────┘
//!                                          │ ErrorClassifier
//!                                          └──► Notification (general listener)
//! ```
//!
//! ## Transport
//!
//! Socket handling and wire framing belong to the vendor connection library.
//! [`transport::Transport`] and [`transport::Connector`] are the seam; the
//! in-process channel transport and the [`adapters::simulator`] back tests and
//! offline runs.

pub mod adapters;
pub mod classifier;
pub mod client;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod messages;
pub mod registry;
pub mod request_id;
pub mod transport;

// Re-export commonly used types
pub use classifier::{ErrorClass, ErrorClassifier, ErrorScope, FailureKind, Notice};
pub use client::GatewayClient;
pub use config::GatewayConfig;
pub use controller::{Controller, HistoricalDataRequest, MarketDataSubscription, RequestHandle};
pub use dispatcher::CallbackDispatcher;
pub use error::{ConfigError, GatewayError, RequestError, TransportError};
pub use messages::{CancelOutcome, GatewayEvent, Notification, OrderOutcome, OutboundMessage};
pub use registry::{PendingRequestRegistry, RequestInfo, RequestKind, RequestMode};
pub use request_id::RequestIdGenerator;
pub use transport::{
    ConnectedTransport, Connector, Transport,
    channel::{ChannelGatewayEnd, ChannelTransport, channel_link},
};
