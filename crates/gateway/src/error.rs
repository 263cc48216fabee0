//! Error types for the gateway crate

use std::time::Duration;

use thiserror::Error;
use tws_core::{DomainError, RequestId};

/// Transport-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Outcome a caller observes through a request handle when a request does not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Request id {0} is already registered")]
    DuplicateRequestId(RequestId),

    #[error("Unsupported order action: {0}")]
    UnsupportedOrderAction(String),

    #[error("Ambiguous contract (code {code}): {message}")]
    AmbiguousContract { code: i32, message: String },

    #[error("Invalid order type (code {code}): {message}")]
    InvalidOrderType { code: i32, message: String },

    #[error("No contract found for request {0}")]
    ContractNotFound(RequestId),

    #[error("Protocol error {code}: {message}")]
    Protocol { code: i32, message: String },

    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("Timed out after {after:?} waiting for request {id}")]
    Timeout { id: RequestId, after: Duration },

    #[error("Request {0} was withdrawn before it completed")]
    Withdrawn(RequestId),

    #[error("Encoding failed: {0}")]
    Encoding(DomainError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Operation not valid for this request mode")]
    InvalidMode,

    #[error("Unexpected payload for request {id}: expected {expected}")]
    UnexpectedPayload { id: RequestId, expected: &'static str },
}

impl RequestError {
    pub fn connection_lost(reason: impl Into<String>) -> Self {
        RequestError::ConnectionLost {
            reason: reason.into(),
        }
    }
}

impl From<DomainError> for RequestError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::UnsupportedOrderAction(action) => {
                RequestError::UnsupportedOrderAction(action)
            }
            other => RequestError::Encoding(other),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Gateway-level errors (connection setup and lifecycle)
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request error: {0}")]
    Request(#[from] RequestError),
}

pub type Result<T> = std::result::Result<T, RequestError>;
