use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::{Price, Symbol};
use crate::wire::{Currency, Exchange, SecurityType};

/// Instrument description sent with orders and data requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Contract {
    /// Gateway contract id, if already resolved
    pub con_id: Option<i64>,
    pub symbol: Symbol,
    pub security_type: SecurityType,
    pub currency: Currency,
    pub exchange: Exchange,
    /// Disambiguates SMART-routed stocks listed on several venues
    pub primary_exchange: Option<Exchange>,
    /// Expiry for derivatives, `YYYYMM` or `YYYYMMDD`
    pub last_trade_date: Option<String>,
}

impl Contract {
    /// SMART-routed USD stock
    pub fn stock(symbol: Symbol) -> Self {
        Self {
            con_id: None,
            symbol,
            security_type: SecurityType::Stock,
            currency: Currency::Usd,
            exchange: Exchange::Smart,
            primary_exchange: None,
            last_trade_date: None,
        }
    }

    /// Currency pair quoted on IDEALPRO, e.g. EUR.USD
    pub fn forex(base: Symbol, quote: Currency) -> Self {
        Self {
            con_id: None,
            symbol: base,
            security_type: SecurityType::Forex,
            currency: quote,
            exchange: Exchange::IdealPro,
            primary_exchange: None,
            last_trade_date: None,
        }
    }

    /// Futures contract for a given expiry
    pub fn future(symbol: Symbol, exchange: Exchange, last_trade_date: impl Into<String>) -> Self {
        Self {
            con_id: None,
            symbol,
            security_type: SecurityType::Future,
            currency: Currency::Usd,
            exchange,
            primary_exchange: None,
            last_trade_date: Some(last_trade_date.into()),
        }
    }

    pub fn with_primary_exchange(mut self, exchange: Exchange) -> Self {
        self.primary_exchange = Some(exchange);
        self
    }

    pub fn with_con_id(mut self, con_id: i64) -> Self {
        self.con_id = Some(con_id);
        self
    }
}

/// Contract details callback payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDetails {
    /// Fully resolved contract (con_id populated)
    pub contract: Contract,
    pub market_name: String,
    pub long_name: String,
    pub min_tick: Price,
    pub price_magnifier: i32,
    pub time_zone_id: String,
    pub trading_hours: String,
}

impl ContractDetails {
    pub fn new(contract: Contract, long_name: impl Into<String>, min_tick: Decimal) -> Self {
        let market_name = contract.symbol.to_string();
        Self {
            contract,
            market_name,
            long_name: long_name.into(),
            min_tick,
            price_magnifier: 1,
            time_zone_id: "US/Eastern".to_string(),
            trading_hours: String::new(),
        }
    }
}
