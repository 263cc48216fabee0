//! Gateway adapters
//!
//! Adapters sit on the far side of a [`Connector`](crate::transport::Connector):
//! they accept encoded requests and produce the callback events a gateway would.

pub mod simulator;

pub use simulator::{SimulatedGateway, SimulatorConnector, SimulatorSettings};
