//! TWS Core Domain
//!
//! Pure domain types for the gateway correlation layer.
//! This crate contains no async, no I/O, and is 100% unit testable.
//!
//! - **Entities**: orders, contracts, bars, ticks and the order-status payloads
//!   delivered by the gateway
//! - **Wire vocabulary**: closed enumerations (bar size, duration, security type,
//!   currency, exchange, order type, ...) each projecting to its canonical wire string
//!   through [`WireParam`]
//! - **Values**: request identifiers, symbols and numeric aliases

pub mod entities;
pub mod error;
pub mod values;
pub mod wire;

// Re-export commonly used types at crate root
pub use entities::{
    Bar, Contract, ContractDetails, MarketTick, Order, OrderAction, OrderState,
    OrderStatusUpdate, OrderType, TickType, TimeInForce, reverse_wire,
};
pub use error::{DomainError, DomainResult};
pub use values::{Price, Quantity, RequestId, Symbol, Timestamp};
pub use wire::{BarSize, Currency, Exchange, HistoricalDuration, SecurityType, WhatToShow, WireParam};
