//! Encoded outbound requests
//!
//! Every string field is produced by a [`WireParam`] projection; nothing here
//! formats parameter values by hand.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tws_core::{
    BarSize, Contract, DomainResult, HistoricalDuration, Order, RequestId, WhatToShow, WireParam,
};

/// Wire format of the historical end date (UTC)
pub(crate) const END_DATE_TIME_FORMAT: &str = "%Y%m%d-%H:%M:%S";

/// Contract fields as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedContract {
    pub con_id: Option<i64>,
    pub symbol: String,
    pub sec_type: String,
    pub currency: String,
    pub exchange: String,
    pub primary_exchange: Option<String>,
    pub last_trade_date: Option<String>,
}

impl EncodedContract {
    pub fn encode(contract: &Contract) -> Self {
        Self {
            con_id: contract.con_id,
            symbol: contract.symbol.to_wire().into_owned(),
            sec_type: contract.security_type.to_wire().into_owned(),
            currency: contract.currency.to_wire().into_owned(),
            exchange: contract.exchange.to_wire().into_owned(),
            primary_exchange: contract.primary_exchange.map(|e| e.to_wire().into_owned()),
            last_trade_date: contract.last_trade_date.clone(),
        }
    }
}

/// Order fields as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedOrder {
    pub action: String,
    pub order_type: String,
    pub total_quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub aux_price: Option<Decimal>,
    pub time_in_force: String,
    pub outside_rth: bool,
}

impl EncodedOrder {
    /// Validate and encode an order ticket
    pub fn encode(order: &Order) -> DomainResult<Self> {
        order.validate()?;
        Ok(Self {
            action: order.action.to_wire().into_owned(),
            order_type: order.order_type.to_wire().into_owned(),
            total_quantity: order.quantity,
            limit_price: order.limit_price,
            aux_price: order.aux_price,
            time_in_force: order.time_in_force.to_wire().into_owned(),
            outside_rth: order.outside_rth,
        })
    }
}

/// Request handed to the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutboundMessage {
    PlaceOrder {
        order_id: RequestId,
        contract: EncodedContract,
        order: EncodedOrder,
    },
    CancelOrder {
        request_id: RequestId,
        order_id: RequestId,
    },
    RequestHistoricalData {
        request_id: RequestId,
        contract: EncodedContract,
        /// Empty means "now"
        end_date_time: String,
        duration: String,
        bar_size: String,
        what_to_show: String,
        use_rth: bool,
    },
    CancelHistoricalData {
        request_id: RequestId,
    },
    RequestContractDetails {
        request_id: RequestId,
        contract: EncodedContract,
    },
    RequestMarketData {
        request_id: RequestId,
        contract: EncodedContract,
        snapshot: bool,
    },
    CancelMarketData {
        request_id: RequestId,
    },
}

impl OutboundMessage {
    /// Build a historical data request
    #[allow(clippy::too_many_arguments)]
    pub fn historical_data(
        request_id: RequestId,
        contract: &Contract,
        end: Option<DateTime<Utc>>,
        duration: HistoricalDuration,
        bar_size: BarSize,
        what_to_show: WhatToShow,
        use_rth: bool,
    ) -> DomainResult<Self> {
        duration.validate()?;
        Ok(Self::RequestHistoricalData {
            request_id,
            contract: EncodedContract::encode(contract),
            end_date_time: end
                .map(|t| t.format(END_DATE_TIME_FORMAT).to_string())
                .unwrap_or_default(),
            duration: duration.to_wire().into_owned(),
            bar_size: bar_size.to_wire().into_owned(),
            what_to_show: what_to_show.to_wire().into_owned(),
            use_rth,
        })
    }

    /// The correlation id carried by this message
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::PlaceOrder { order_id, .. } => *order_id,
            Self::CancelOrder { request_id, .. }
            | Self::RequestHistoricalData { request_id, .. }
            | Self::CancelHistoricalData { request_id }
            | Self::RequestContractDetails { request_id, .. }
            | Self::RequestMarketData { request_id, .. }
            | Self::CancelMarketData { request_id } => *request_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaceOrder { .. } => "placeOrder",
            Self::CancelOrder { .. } => "cancelOrder",
            Self::RequestHistoricalData { .. } => "reqHistoricalData",
            Self::CancelHistoricalData { .. } => "cancelHistoricalData",
            Self::RequestContractDetails { .. } => "reqContractDetails",
            Self::RequestMarketData { .. } => "reqMktData",
            Self::CancelMarketData { .. } => "cancelMktData",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use tws_core::{DomainError, Exchange, OrderAction, Symbol, TimeInForce};

    fn aapl() -> Contract {
        Contract::stock(Symbol::new("AAPL").unwrap()).with_primary_exchange(Exchange::Island)
    }

    #[test]
    fn test_encode_contract() {
        let encoded = EncodedContract::encode(&aapl());
        assert_eq!(encoded.symbol, "AAPL");
        assert_eq!(encoded.sec_type, "STK");
        assert_eq!(encoded.currency, "USD");
        assert_eq!(encoded.exchange, "SMART");
        assert_eq!(encoded.primary_exchange.as_deref(), Some("ISLAND"));
    }

    #[test]
    fn test_encode_order() {
        let order = Order::limit(OrderAction::ShortSell, dec!(50), dec!(187.5), TimeInForce::Gtc);
        let encoded = EncodedOrder::encode(&order).unwrap();
        assert_eq!(encoded.action, "SSHORT");
        assert_eq!(encoded.order_type, "LMT");
        assert_eq!(encoded.time_in_force, "GTC");
        assert_eq!(encoded.limit_price, Some(dec!(187.5)));
    }

    #[test]
    fn test_encode_invalid_order_fails() {
        let order = Order::market(OrderAction::Buy, dec!(0));
        assert!(matches!(
            EncodedOrder::encode(&order),
            Err(DomainError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_historical_request_fields() {
        let end = Utc.with_ymd_and_hms(2024, 3, 15, 20, 0, 0).unwrap();
        let msg = OutboundMessage::historical_data(
            RequestId::new(9),
            &aapl(),
            Some(end),
            HistoricalDuration::Days(2),
            BarSize::Min5,
            WhatToShow::Trades,
            true,
        )
        .unwrap();

        assert_eq!(msg.request_id(), RequestId::new(9));
        match msg {
            OutboundMessage::RequestHistoricalData {
                end_date_time,
                duration,
                bar_size,
                what_to_show,
                ..
            } => {
                assert_eq!(end_date_time, "20240315-20:00:00");
                assert_eq!(duration, "2 D");
                assert_eq!(bar_size, "5 mins");
                assert_eq!(what_to_show, "TRADES");
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_historical_request_rejects_zero_duration() {
        let result = OutboundMessage::historical_data(
            RequestId::new(1),
            &aapl(),
            None,
            HistoricalDuration::Days(0),
            BarSize::Day1,
            WhatToShow::Midpoint,
            false,
        );
        assert!(matches!(result, Err(DomainError::InvalidDuration(_))));
    }
}
