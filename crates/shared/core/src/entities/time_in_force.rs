use crate::wire::WireParam;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Time-in-force instructions for order validity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Day order: automatically canceled at end of trading day
    Day,

    /// Good Till Canceled: order remains active until explicitly canceled
    Gtc,

    /// Immediate or Cancel: execute immediately (partially or fully) and cancel unfilled portion
    Ioc,

    /// Fill or Kill: execute immediately and completely, or cancel entire order
    Fok,

    /// At the opening
    Opg,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "DAY",
            Self::Gtc => "GTC",
            Self::Ioc => "IOC",
            Self::Fok => "FOK",
            Self::Opg => "OPG",
        }
    }

    /// Returns true if partial fills are allowed
    pub fn allows_partial_fill(&self) -> bool {
        !matches!(self, TimeInForce::Fok)
    }
}

impl WireParam for TimeInForce {
    fn to_wire(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.as_str())
    }
}
