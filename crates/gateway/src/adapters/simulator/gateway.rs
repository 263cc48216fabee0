//! Simulated gateway
//!
//! Sits on the gateway end of a channel link and answers requests the way the
//! real gateway does, including its error codes and its callback ordering.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tws_core::{
    Bar, BarSize, Contract, ContractDetails, Exchange, MarketTick, OrderState, OrderStatusUpdate,
    Price, RequestId, Symbol, TickType,
};

use crate::error::TransportError;
use crate::messages::outbound::END_DATE_TIME_FORMAT;
use crate::messages::{EncodedContract, EncodedOrder, GatewayEvent, OutboundMessage};
use crate::transport::channel::ChannelGatewayEnd;

/// Error codes the simulator emits
pub mod codes {
    pub const ORDER_NOT_CANCELLABLE: i32 = 161;
    pub const NO_SECURITY_DEFINITION: i32 = 200;
    pub const ORDER_CANCELLED: i32 = 202;
    pub const UNSUPPORTED_ORDER_TYPE: i32 = 387;
    pub const MARKET_DATA_FARM_OK: i32 = 2104;
}

/// One tradable listing
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub details: ContractDetails,
    pub last_price: Price,
}

impl Listing {
    pub fn new(details: ContractDetails, last_price: Price) -> Self {
        Self {
            details,
            last_price,
        }
    }

    fn matches(&self, contract: &EncodedContract) -> bool {
        let listed = &self.details.contract;
        if listed.symbol.as_str() != contract.symbol
            || listed.security_type.as_str() != contract.sec_type
        {
            return false;
        }
        if let Some(con_id) = contract.con_id {
            return listed.con_id == Some(con_id);
        }
        match (&contract.primary_exchange, listed.primary_exchange) {
            (Some(wanted), Some(primary)) => primary.as_str() == wanted.as_str(),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }
}

/// Simulator behaviour
#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    /// Announced on connect
    pub next_valid_id: RequestId,
    /// Bars streamed per historical data request
    pub bars_per_request: usize,
    /// Order types accepted; anything else is rejected with 387
    pub order_types: HashSet<String>,
    pub listings: Vec<Listing>,
}

impl SimulatorSettings {
    pub fn with_listing(mut self, listing: Listing) -> Self {
        self.listings.push(listing);
        self
    }

    pub fn with_next_valid_id(mut self, id: RequestId) -> Self {
        self.next_valid_id = id;
        self
    }

    pub fn with_bars_per_request(mut self, bars: usize) -> Self {
        self.bars_per_request = bars;
        self
    }
}

impl Default for SimulatorSettings {
    /// AAPL and MSFT on NASDAQ, plus BP which is listed twice (NYSE and LSE)
    /// and so is ambiguous unless a primary exchange or con id is given.
    fn default() -> Self {
        let listings = default_listings().unwrap_or_default();
        Self {
            next_valid_id: RequestId::new(1),
            bars_per_request: 5,
            order_types: ["MKT", "LMT"].into_iter().map(String::from).collect(),
            listings,
        }
    }
}

fn default_listings() -> tws_core::DomainResult<Vec<Listing>> {
    let stock = |symbol: &str, con_id: i64, primary: Exchange| -> tws_core::DomainResult<Contract> {
        Ok(Contract::stock(Symbol::new(symbol)?)
            .with_con_id(con_id)
            .with_primary_exchange(primary))
    };
    Ok(vec![
        Listing::new(
            ContractDetails::new(stock("AAPL", 265598, Exchange::Island)?, "APPLE INC", dec!(0.01)),
            dec!(190.00),
        ),
        Listing::new(
            ContractDetails::new(stock("MSFT", 272093, Exchange::Island)?, "MICROSOFT CORP", dec!(0.01)),
            dec!(410.00),
        ),
        Listing::new(
            ContractDetails::new(stock("BP", 4717, Exchange::Nyse)?, "BP PLC-SPONS ADR", dec!(0.01)),
            dec!(35.00),
        ),
        Listing::new(
            ContractDetails::new(stock("BP", 14169, Exchange::Lse)?, "BP PLC", dec!(0.05)),
            dec!(4.80),
        ),
    ])
}

/// An accepted limit order that has not traded
#[derive(Debug, Clone)]
struct RestingOrder {
    quantity: Decimal,
}

/// Gateway end of a simulated connection
pub struct SimulatedGateway {
    end: ChannelGatewayEnd,
    settings: SimulatorSettings,
    resting: HashMap<RequestId, RestingOrder>,
    /// Orders that filled or were cancelled
    finished: HashSet<RequestId>,
    subscriptions: HashSet<RequestId>,
    next_perm_id: i64,
}

impl SimulatedGateway {
    pub fn new(end: ChannelGatewayEnd, settings: SimulatorSettings) -> Self {
        Self {
            end,
            settings,
            resting: HashMap::new(),
            finished: HashSet::new(),
            subscriptions: HashSet::new(),
            next_perm_id: 1_000_000,
        }
    }

    /// Serve requests until the client side of the link goes away
    pub async fn run(mut self) -> Result<(), TransportError> {
        info!("SimulatedGateway started");

        self.emit(GatewayEvent::NextValidId(self.settings.next_valid_id))
            .await?;
        self.emit(GatewayEvent::error(
            -1,
            codes::MARKET_DATA_FARM_OK,
            "Market data farm connection is OK:usfarm",
        ))
        .await?;

        while let Some(request) = self.end.next_request().await {
            debug!("Simulator received {} for {}", request.name(), request.request_id());
            match self.handle(request).await {
                Ok(()) => {}
                Err(TransportError::ChannelClosed) => break,
                Err(e) => return Err(e),
            }
        }

        info!("SimulatedGateway stopped");
        Ok(())
    }

    async fn handle(&mut self, request: OutboundMessage) -> Result<(), TransportError> {
        match request {
            OutboundMessage::PlaceOrder {
                order_id,
                contract,
                order,
            } => self.place_order(order_id, &contract, &order).await,
            OutboundMessage::CancelOrder {
                request_id,
                order_id,
            } => self.cancel_order(request_id, order_id).await,
            OutboundMessage::RequestHistoricalData {
                request_id,
                contract,
                end_date_time,
                bar_size,
                ..
            } => {
                self.historical_data(request_id, &contract, &end_date_time, &bar_size)
                    .await
            }
            OutboundMessage::CancelHistoricalData { request_id } => {
                debug!("Historical data {} cancelled", request_id);
                Ok(())
            }
            OutboundMessage::RequestContractDetails {
                request_id,
                contract,
            } => self.contract_details(request_id, &contract).await,
            OutboundMessage::RequestMarketData {
                request_id,
                contract,
                ..
            } => self.market_data(request_id, &contract).await,
            OutboundMessage::CancelMarketData { request_id } => {
                self.subscriptions.remove(&request_id);
                Ok(())
            }
        }
    }

    /// Resolve a contract to exactly one listing, emitting 200 otherwise
    async fn resolve_listing(
        &self,
        id: RequestId,
        contract: &EncodedContract,
    ) -> Result<Option<Listing>, TransportError> {
        let mut matches: Vec<&Listing> = self
            .settings
            .listings
            .iter()
            .filter(|l| l.matches(contract))
            .collect();

        match matches.len() {
            1 => Ok(matches.pop().cloned()),
            0 => {
                self.emit(GatewayEvent::error(
                    id.value() as i64,
                    codes::NO_SECURITY_DEFINITION,
                    "No security definition has been found for the request",
                ))
                .await?;
                Ok(None)
            }
            _ => {
                self.emit(GatewayEvent::error(
                    id.value() as i64,
                    codes::NO_SECURITY_DEFINITION,
                    format!(
                        "The contract description specified for {} is ambiguous",
                        contract.symbol
                    ),
                ))
                .await?;
                Ok(None)
            }
        }
    }

    async fn place_order(
        &mut self,
        order_id: RequestId,
        contract: &EncodedContract,
        order: &EncodedOrder,
    ) -> Result<(), TransportError> {
        if !self.settings.order_types.contains(&order.order_type) {
            warn!("Simulator rejecting order {}: {} unsupported", order_id, order.order_type);
            return self
                .emit(GatewayEvent::error(
                    order_id.value() as i64,
                    codes::UNSUPPORTED_ORDER_TYPE,
                    format!("Unsupported order type: {}", order.order_type),
                ))
                .await;
        }

        let Some(listing) = self.resolve_listing(order_id, contract).await? else {
            return Ok(());
        };

        let perm_id = self.next_perm_id;
        self.next_perm_id += 1;

        let mut submitted =
            OrderStatusUpdate::new(order_id, OrderState::Submitted, order.total_quantity);
        submitted.perm_id = perm_id;
        self.emit(GatewayEvent::OrderStatus(submitted)).await?;

        let buying = order.action == "BUY";
        let marketable = match order.limit_price {
            None => true,
            Some(limit) if buying => limit >= listing.last_price,
            Some(limit) => limit <= listing.last_price,
        };

        if marketable {
            let mut filled =
                OrderStatusUpdate::filled(order_id, order.total_quantity, listing.last_price);
            filled.perm_id = perm_id;
            info!(
                "Simulator filled order {}: {} {} {} @ {}",
                order_id, order.action, order.total_quantity, contract.symbol, listing.last_price
            );
            self.finished.insert(order_id);
            self.emit(GatewayEvent::OrderStatus(filled)).await
        } else {
            debug!("Simulator resting order {} at {:?}", order_id, order.limit_price);
            self.resting.insert(
                order_id,
                RestingOrder {
                    quantity: order.total_quantity,
                },
            );
            Ok(())
        }
    }

    async fn cancel_order(
        &mut self,
        request_id: RequestId,
        order_id: RequestId,
    ) -> Result<(), TransportError> {
        let Some(resting) = self.resting.remove(&order_id) else {
            debug!(
                "Cancel {} for order {} which is not working (finished: {})",
                request_id,
                order_id,
                self.finished.contains(&order_id)
            );
            return self
                .emit(GatewayEvent::error(
                    order_id.value() as i64,
                    codes::ORDER_NOT_CANCELLABLE,
                    format!(
                        "Cancel attempted when order {} is not in a cancellable state",
                        order_id
                    ),
                ))
                .await;
        };

        self.finished.insert(order_id);
        self.emit(GatewayEvent::error(
            order_id.value() as i64,
            codes::ORDER_CANCELLED,
            format!("Order Canceled - reason: cancel request {}", request_id),
        ))
        .await?;
        self.emit(GatewayEvent::OrderStatus(OrderStatusUpdate::new(
            order_id,
            OrderState::Cancelled,
            resting.quantity,
        )))
        .await
    }

    async fn historical_data(
        &self,
        request_id: RequestId,
        contract: &EncodedContract,
        end_date_time: &str,
        bar_size: &str,
    ) -> Result<(), TransportError> {
        let Some(listing) = self.resolve_listing(request_id, contract).await? else {
            return Ok(());
        };

        let end = parse_end(end_date_time);
        let step = BarSize::from_wire(bar_size)
            .map(|size| Duration::seconds(size.seconds()))
            .unwrap_or_else(|| Duration::minutes(1));

        let tick = listing.details.min_tick;
        let count = self.settings.bars_per_request;
        let mut close = listing.last_price - tick * Decimal::from(count);
        for i in 0..count {
            let open = close;
            close = open + tick;
            let bar = Bar {
                time: end - step * (count - i) as i32,
                open,
                high: close + tick,
                low: open - tick,
                close,
                volume: Decimal::from(100 * (i + 1)),
                wap: (open + close) / dec!(2),
                count: 10,
            };
            self.emit(GatewayEvent::HistoricalBar { request_id, bar })
                .await?;
        }
        self.emit(GatewayEvent::HistoricalDataEnd { request_id }).await
    }

    /// Every matching listing, then the end marker; unlike orders, several
    /// matches are not an error here
    async fn contract_details(
        &self,
        request_id: RequestId,
        contract: &EncodedContract,
    ) -> Result<(), TransportError> {
        let matches: Vec<ContractDetails> = self
            .settings
            .listings
            .iter()
            .filter(|l| l.matches(contract))
            .map(|l| l.details.clone())
            .collect();
        for details in matches {
            self.emit(GatewayEvent::ContractDetails {
                request_id,
                details,
            })
            .await?;
        }
        self.emit(GatewayEvent::ContractDetailsEnd { request_id })
            .await
    }

    async fn market_data(
        &mut self,
        request_id: RequestId,
        contract: &EncodedContract,
    ) -> Result<(), TransportError> {
        let Some(listing) = self.resolve_listing(request_id, contract).await? else {
            return Ok(());
        };
        self.subscriptions.insert(request_id);

        let tick = listing.details.min_tick;
        let now = Utc::now();
        let quotes = [
            (TickType::Bid, listing.last_price - tick),
            (TickType::Ask, listing.last_price + tick),
            (TickType::Last, listing.last_price),
            (TickType::LastSize, dec!(100)),
        ];
        for (tick_type, value) in quotes {
            self.emit(GatewayEvent::Tick {
                request_id,
                tick: MarketTick::new(tick_type, value, now),
            })
            .await?;
        }
        Ok(())
    }

    async fn emit(&self, event: GatewayEvent) -> Result<(), TransportError> {
        self.end.emit(event).await
    }
}

fn parse_end(end_date_time: &str) -> DateTime<Utc> {
    if end_date_time.is_empty() {
        return Utc::now();
    }
    match NaiveDateTime::parse_from_str(end_date_time, END_DATE_TIME_FORMAT) {
        Ok(naive) => naive.and_utc(),
        Err(e) => {
            warn!("Unparseable end time {:?} ({}), using now", end_date_time, e);
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::channel::channel_link;
    use tws_core::SecurityType;

    fn encoded(symbol: &str) -> EncodedContract {
        EncodedContract::encode(&Contract::stock(Symbol::new(symbol).unwrap()))
    }

    #[test]
    fn test_listing_matching() {
        let settings = SimulatorSettings::default();
        let bp: Vec<_> = settings
            .listings
            .iter()
            .filter(|l| l.matches(&encoded("BP")))
            .collect();
        assert_eq!(bp.len(), 2);

        let mut nyse = encoded("BP");
        nyse.primary_exchange = Some("NYSE".to_string());
        let bp: Vec<_> = settings.listings.iter().filter(|l| l.matches(&nyse)).collect();
        assert_eq!(bp.len(), 1);
        assert_eq!(bp[0].details.contract.con_id, Some(4717));

        let mut by_id = encoded("BP");
        by_id.con_id = Some(14169);
        assert_eq!(
            settings.listings.iter().filter(|l| l.matches(&by_id)).count(),
            1
        );

        let mut future = encoded("AAPL");
        future.sec_type = SecurityType::Future.as_str().to_string();
        assert_eq!(
            settings.listings.iter().filter(|l| l.matches(&future)).count(),
            0
        );
    }

    #[test]
    fn test_parse_end() {
        let end = parse_end("20240301-16:00:00");
        assert_eq!(end.format(END_DATE_TIME_FORMAT).to_string(), "20240301-16:00:00");
    }

    #[tokio::test]
    async fn test_announces_next_valid_id() {
        let (mut link, end) = channel_link(8, 8);
        let settings = SimulatorSettings::default().with_next_valid_id(RequestId::new(42));
        tokio::spawn(SimulatedGateway::new(end, settings).run());

        assert_eq!(
            link.events.recv().await,
            Some(GatewayEvent::NextValidId(RequestId::new(42)))
        );
        assert!(matches!(
            link.events.recv().await,
            Some(GatewayEvent::Error { request_id: None, code: 2104, .. })
        ));
    }
}
