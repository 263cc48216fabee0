use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::DomainError;
use crate::values::{Price, Quantity, RequestId};

/// Order lifecycle state as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Transmitted, not yet acknowledged
    PendingSubmit,
    /// Cancel sent, not yet confirmed
    PendingCancel,
    /// Accepted but not yet elected (e.g. waiting for a trigger)
    PreSubmitted,
    /// Working at the destination
    Submitted,
    /// Cancelled by the gateway before reaching the destination
    ApiCancelled,
    Cancelled,
    Filled,
    /// Rejected or otherwise inactive
    Inactive,
}

impl OrderState {
    /// Returns true if no further status changes are expected
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::ApiCancelled | OrderState::Cancelled | OrderState::Filled | OrderState::Inactive
        )
    }

    /// Returns true if the order ended by cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderState::ApiCancelled | OrderState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingSubmit => "PendingSubmit",
            Self::PendingCancel => "PendingCancel",
            Self::PreSubmitted => "PreSubmitted",
            Self::Submitted => "Submitted",
            Self::ApiCancelled => "ApiCancelled",
            Self::Cancelled => "Cancelled",
            Self::Filled => "Filled",
            Self::Inactive => "Inactive",
        }
    }
}

impl FromStr for OrderState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PendingSubmit" => Ok(Self::PendingSubmit),
            "PendingCancel" => Ok(Self::PendingCancel),
            "PreSubmitted" => Ok(Self::PreSubmitted),
            "Submitted" => Ok(Self::Submitted),
            "ApiCancelled" => Ok(Self::ApiCancelled),
            "Cancelled" => Ok(Self::Cancelled),
            "Filled" => Ok(Self::Filled),
            "Inactive" => Ok(Self::Inactive),
            other => Err(DomainError::UnknownOrderState(other.to_string())),
        }
    }
}

/// Order status callback payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    /// The order id, i.e. the request id the order was placed under
    pub order_id: RequestId,
    pub state: OrderState,
    pub filled: Quantity,
    pub remaining: Quantity,
    pub avg_fill_price: Price,
    pub last_fill_price: Price,
    /// Gateway-wide permanent id
    pub perm_id: i64,
    pub why_held: Option<String>,
}

impl OrderStatusUpdate {
    /// Status without fills
    pub fn new(order_id: RequestId, state: OrderState, remaining: Quantity) -> Self {
        Self {
            order_id,
            state,
            filled: Decimal::ZERO,
            remaining,
            avg_fill_price: Decimal::ZERO,
            last_fill_price: Decimal::ZERO,
            perm_id: 0,
            why_held: None,
        }
    }

    /// Fully filled status
    pub fn filled(order_id: RequestId, quantity: Quantity, avg_fill_price: Price) -> Self {
        Self {
            order_id,
            state: OrderState::Filled,
            filled: quantity,
            remaining: Decimal::ZERO,
            avg_fill_price,
            last_fill_price: avg_fill_price,
            perm_id: 0,
            why_held: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
