use crate::wire::WireParam;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Order types understood by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Execute at current market price
    Market,
    /// Execute at specified price or better
    Limit,
    /// Market order triggered when price reaches the aux (stop) price
    Stop,
    /// Limit order triggered when price reaches the aux (stop) price
    StopLimit,
    MarketOnClose,
    LimitOnClose,
    /// Trailing stop, trail amount carried in the aux price
    Trail,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "MKT",
            Self::Limit => "LMT",
            Self::Stop => "STP",
            Self::StopLimit => "STP LMT",
            Self::MarketOnClose => "MOC",
            Self::LimitOnClose => "LOC",
            Self::Trail => "TRAIL",
        }
    }

    /// Returns true if a limit price is mandatory
    pub fn requires_limit_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit | Self::LimitOnClose)
    }

    /// Returns true if an aux price (stop trigger or trail amount) is mandatory
    pub fn requires_aux_price(&self) -> bool {
        matches!(self, Self::Stop | Self::StopLimit | Self::Trail)
    }
}

impl WireParam for OrderType {
    fn to_wire(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.as_str())
    }
}
