//! Simulator adapter
//!
//! An in-process stand-in for the vendor gateway, connected through the channel
//! transport. Used by the integration tests and for running strategies offline.

mod connector;
mod gateway;

pub use connector::SimulatorConnector;
pub use gateway::{Listing, SimulatedGateway, SimulatorSettings, codes};
