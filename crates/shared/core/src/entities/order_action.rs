use crate::error::{DomainError, DomainResult};
use crate::wire::WireParam;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;

/// Order action (direction of the trade)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderAction {
    Buy,
    Sell,
    /// Sell short; reversing it buys the position back
    ShortSell,
}

impl OrderAction {
    /// Returns the action that offsets this one
    ///
    /// Buy and Sell swap; a short sale is covered by a Buy.
    pub fn reverse(&self) -> Self {
        match self {
            OrderAction::Buy => OrderAction::Sell,
            OrderAction::Sell => OrderAction::Buy,
            OrderAction::ShortSell => OrderAction::Buy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::ShortSell => "SSHORT",
        }
    }
}

impl FromStr for OrderAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            "SSHORT" => Ok(Self::ShortSell),
            other => Err(DomainError::UnsupportedOrderAction(other.to_string())),
        }
    }
}

impl WireParam for OrderAction {
    fn to_wire(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.as_str())
    }
}

/// Reverse an action received as a raw wire string
///
/// Anything outside the enumeration is rejected with `UnsupportedOrderAction`
/// rather than mapped to a default.
pub fn reverse_wire(action: &str) -> DomainResult<OrderAction> {
    action.parse::<OrderAction>().map(|a| a.reverse())
}
