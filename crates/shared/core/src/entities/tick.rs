use serde::{Deserialize, Serialize};

use crate::values::Timestamp;
use rust_decimal::Decimal;

/// Market data field carried by a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickType {
    BidSize,
    Bid,
    Ask,
    AskSize,
    Last,
    LastSize,
    High,
    Low,
    Volume,
    Close,
    Open,
    /// Any field this layer does not name, keyed by its wire code
    Other(i32),
}

impl TickType {
    /// Map a wire tick code to its field
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::BidSize,
            1 => Self::Bid,
            2 => Self::Ask,
            3 => Self::AskSize,
            4 => Self::Last,
            5 => Self::LastSize,
            6 => Self::High,
            7 => Self::Low,
            8 => Self::Volume,
            9 => Self::Close,
            14 => Self::Open,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::BidSize => 0,
            Self::Bid => 1,
            Self::Ask => 2,
            Self::AskSize => 3,
            Self::Last => 4,
            Self::LastSize => 5,
            Self::High => 6,
            Self::Low => 7,
            Self::Volume => 8,
            Self::Close => 9,
            Self::Open => 14,
            Self::Other(code) => *code,
        }
    }

    pub fn is_size(&self) -> bool {
        matches!(self, Self::BidSize | Self::AskSize | Self::LastSize | Self::Volume)
    }
}

/// Single market data update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTick {
    pub tick_type: TickType,
    pub value: Decimal,
    pub received_at: Timestamp,
}

impl MarketTick {
    pub fn new(tick_type: TickType, value: Decimal, received_at: Timestamp) -> Self {
        Self {
            tick_type,
            value,
            received_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_code_mapping() {
        for code in [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 14, 37] {
            assert_eq!(TickType::from_code(code).code(), code);
        }
        assert_eq!(TickType::from_code(37), TickType::Other(37));
        assert!(TickType::Volume.is_size());
        assert!(!TickType::Bid.is_size());
    }
}
