use super::WireParam;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Field selector for historical data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WhatToShow {
    Trades,
    Midpoint,
    Bid,
    Ask,
    BidAsk,
    AdjustedLast,
    HistoricalVolatility,
    OptionImpliedVolatility,
}

impl WhatToShow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trades => "TRADES",
            Self::Midpoint => "MIDPOINT",
            Self::Bid => "BID",
            Self::Ask => "ASK",
            Self::BidAsk => "BID_ASK",
            Self::AdjustedLast => "ADJUSTED_LAST",
            Self::HistoricalVolatility => "HISTORICAL_VOLATILITY",
            Self::OptionImpliedVolatility => "OPTION_IMPLIED_VOLATILITY",
        }
    }
}

impl WireParam for WhatToShow {
    fn to_wire(&self) -> Cow<'static, str> {
        Cow::Borrowed(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_what_to_show_wire() {
        assert_eq!(WhatToShow::BidAsk.to_wire(), "BID_ASK");
        assert_eq!(WhatToShow::Trades.to_wire(), "TRADES");
    }
}
