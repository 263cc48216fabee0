use serde::{Deserialize, Serialize};

use crate::values::{Price, Quantity, Timestamp};

/// Historical bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time
    pub time: Timestamp,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    /// Volume-weighted average price
    pub wap: Price,
    /// Number of trades in the bar
    pub count: i64,
}

impl Bar {
    /// Returns true if the high/low envelope contains open and close
    pub fn is_consistent(&self) -> bool {
        self.low <= self.high
            && self.open >= self.low
            && self.open <= self.high
            && self.close >= self.low
            && self.close <= self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn test_bar_consistency() {
        let mut bar = Bar {
            time: Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap(),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100.5),
            volume: dec!(1200),
            wap: dec!(100.2),
            count: 42,
        };
        assert!(bar.is_consistent());

        bar.close = dec!(102);
        assert!(!bar.is_consistent());
    }
}
