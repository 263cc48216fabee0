//! Controller - the public operation surface
//!
//! Every operation follows the same sequence:
//! 1. encode and validate parameters (fails fast, before an id is spent)
//! 2. allocate a request id
//! 3. register the pending request (before any wire traffic, so a callback can
//!    never arrive for an id the registry does not know)
//! 4. send the encoded request
//! 5. return a handle the dispatcher completes asynchronously

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::{mpsc, oneshot};
use tws_core::{
    Bar, BarSize, Contract, ContractDetails, HistoricalDuration, MarketTick, Order, OrderAction,
    RequestId, WhatToShow, reverse_wire,
};

use crate::error::{RequestError, Result};
use crate::messages::{
    CancelOutcome, Completion, EncodedContract, EncodedOrder, OrderOutcome, OutboundMessage,
    Response, ResponsePayload,
};
use crate::registry::{PendingRequestRegistry, RequestKind, RequestMode, StreamItem};
use crate::request_id::RequestIdGenerator;
use crate::transport::Transport;

/// Parameters of a historical bar request
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalDataRequest {
    pub contract: Contract,
    /// End of the window; `None` means now
    pub end: Option<DateTime<Utc>>,
    pub duration: HistoricalDuration,
    pub bar_size: BarSize,
    pub what_to_show: WhatToShow,
    /// Regular trading hours only
    pub use_rth: bool,
}

impl HistoricalDataRequest {
    /// Trades, regular trading hours, ending now
    pub fn new(contract: Contract, duration: HistoricalDuration, bar_size: BarSize) -> Self {
        Self {
            contract,
            end: None,
            duration,
            bar_size,
            what_to_show: WhatToShow::Trades,
            use_rth: true,
        }
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_what_to_show(mut self, what_to_show: WhatToShow) -> Self {
        self.what_to_show = what_to_show;
        self
    }

    pub fn with_use_rth(mut self, use_rth: bool) -> Self {
        self.use_rth = use_rth;
        self
    }
}

type Convert<T> = fn(RequestId, Response) -> Result<T>;

/// Pending result of a single-shot or streaming request
///
/// Waiting with a timeout never removes the registry entry: a late callback is
/// still routed normally and its value discarded.
pub struct RequestHandle<T> {
    id: RequestId,
    kind: RequestKind,
    rx: oneshot::Receiver<Completion>,
    convert: Convert<T>,
    default_timeout: Option<Duration>,
}

impl<T> std::fmt::Debug for RequestHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl<T> RequestHandle<T> {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Wait using the configured default timeout (indefinitely if none)
    pub async fn wait(self) -> Result<T> {
        match self.default_timeout {
            Some(timeout) => self.wait_timeout(timeout).await,
            None => self.wait_indefinitely().await,
        }
    }

    /// Wait at most `timeout`
    pub async fn wait_timeout(self, timeout: Duration) -> Result<T> {
        let Self {
            id,
            kind,
            rx,
            convert,
            ..
        } = self;
        match tokio::time::timeout(timeout, rx).await {
            Ok(received) => Self::finish(id, convert, received),
            Err(_) => {
                warn!(
                    "{} request {} timed out after {:?}; entry left registered",
                    kind.name(),
                    id,
                    timeout
                );
                Err(RequestError::Timeout { id, after: timeout })
            }
        }
    }

    pub async fn wait_indefinitely(self) -> Result<T> {
        let Self { id, rx, convert, .. } = self;
        Self::finish(id, convert, rx.await)
    }

    fn finish(
        id: RequestId,
        convert: Convert<T>,
        received: std::result::Result<Completion, oneshot::error::RecvError>,
    ) -> Result<T> {
        match received {
            Ok(Ok(response)) => convert(id, response),
            Ok(Err(e)) => Err(e),
            // entry removed without fulfilment
            Err(_) => Err(RequestError::Withdrawn(id)),
        }
    }
}

/// Live market data for one contract
///
/// Ends (yields `None`) after `unsubscribe`, or after delivering a terminal error.
pub struct MarketDataSubscription {
    id: RequestId,
    rx: mpsc::UnboundedReceiver<StreamItem>,
}

impl MarketDataSubscription {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub async fn next(&mut self) -> Option<Result<MarketTick>> {
        let item = self.rx.recv().await?;
        Some(item.and_then(|payload| match payload {
            ResponsePayload::Tick(tick) => Ok(tick),
            _ => Err(RequestError::UnexpectedPayload {
                id: self.id,
                expected: "tick",
            }),
        }))
    }
}

/// Public operation surface over one connection
pub struct Controller {
    ids: Arc<RequestIdGenerator>,
    registry: Arc<PendingRequestRegistry>,
    transport: Arc<dyn Transport>,
    default_timeout: Option<Duration>,
}

impl Controller {
    pub fn new(
        ids: Arc<RequestIdGenerator>,
        registry: Arc<PendingRequestRegistry>,
        transport: Arc<dyn Transport>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            ids,
            registry,
            transport,
            default_timeout,
        }
    }

    /// Place an order; completes on its terminal status
    pub async fn place_order(
        &self,
        contract: &Contract,
        order: &Order,
    ) -> Result<RequestHandle<OrderOutcome>> {
        let encoded_order = EncodedOrder::encode(order)?;
        let encoded_contract = EncodedContract::encode(contract);

        let id = self.ids.next();
        let rx = self
            .registry
            .register(id, RequestKind::PlaceOrder, RequestMode::SingleShot)?;
        self.send(
            id,
            OutboundMessage::PlaceOrder {
                order_id: id,
                contract: encoded_contract,
                order: encoded_order,
            },
        )
        .await?;

        info!(
            "Placed order {}: {} {} {} {}",
            id,
            order.action.as_str(),
            order.quantity,
            contract.symbol,
            order.order_type.as_str()
        );
        Ok(self.handle(id, RequestKind::PlaceOrder, rx, order_outcome))
    }

    /// Place the order that offsets `original` (same ticket, reversed action)
    pub async fn place_offsetting_order(
        &self,
        contract: &Contract,
        original: &Order,
    ) -> Result<RequestHandle<OrderOutcome>> {
        let offset = original.offsetting();
        debug!(
            "Offsetting {} with {}",
            original.action.as_str(),
            offset.action.as_str()
        );
        self.place_order(contract, &offset).await
    }

    /// The action that offsets `action`, given as its wire string
    ///
    /// Fails with `UnsupportedOrderAction` for anything outside BUY, SELL and SSHORT.
    pub fn reverse(action: &str) -> Result<OrderAction> {
        Ok(reverse_wire(action)?)
    }

    /// Cancel the order placed under `order_id`
    ///
    /// Completes with `Cancelled` on acknowledgement, or `AlreadyTerminal` if the
    /// order had already filled or been cancelled.
    pub async fn cancel_order(&self, order_id: RequestId) -> Result<RequestHandle<CancelOutcome>> {
        let id = self.ids.next();
        let kind = RequestKind::CancelOrder { order_id };
        let rx = self.registry.register(id, kind, RequestMode::SingleShot)?;
        self.send(
            id,
            OutboundMessage::CancelOrder {
                request_id: id,
                order_id,
            },
        )
        .await?;

        info!("Cancel {} sent for order {}", id, order_id);
        Ok(self.handle(id, kind, rx, cancel_outcome))
    }

    /// Request historical bars; completes with every bar, in delivery order
    pub async fn request_historical_data(
        &self,
        request: &HistoricalDataRequest,
    ) -> Result<RequestHandle<Vec<Bar>>> {
        request.duration.validate()?;

        let id = self.ids.next();
        let msg = OutboundMessage::historical_data(
            id,
            &request.contract,
            request.end,
            request.duration,
            request.bar_size,
            request.what_to_show,
            request.use_rth,
        )?;
        let rx = self
            .registry
            .register(id, RequestKind::HistoricalData, RequestMode::Streaming)?;
        self.send(id, msg).await?;

        info!(
            "Historical data {} requested for {} ({} of {})",
            id,
            request.contract.symbol,
            request.bar_size.as_str(),
            request.what_to_show.as_str()
        );
        Ok(self.handle(id, RequestKind::HistoricalData, rx, bars))
    }

    /// Withdraw a historical data request
    ///
    /// Fails with `InvalidMode` if `id` belongs to another kind of request.
    pub async fn cancel_historical_data(&self, id: RequestId) -> Result<()> {
        self.withdraw(id, RequestKind::HistoricalData)?;
        self.transport
            .send(&OutboundMessage::CancelHistoricalData { request_id: id })
            .await?;
        info!("Historical data {} cancelled", id);
        Ok(())
    }

    /// Resolve a contract to exactly one set of details
    ///
    /// Fails with `ContractNotFound` if nothing matches and `AmbiguousContract`
    /// if several contracts do.
    pub async fn request_contract_details(
        &self,
        contract: &Contract,
    ) -> Result<RequestHandle<ContractDetails>> {
        let (id, rx) = self.send_contract_details(contract).await?;
        Ok(self.handle(id, RequestKind::ContractDetails, rx, single_contract_details))
    }

    /// Every contract matching `contract`
    pub async fn request_contract_details_all(
        &self,
        contract: &Contract,
    ) -> Result<RequestHandle<Vec<ContractDetails>>> {
        let (id, rx) = self.send_contract_details(contract).await?;
        Ok(self.handle(id, RequestKind::ContractDetails, rx, contract_details))
    }

    async fn send_contract_details(
        &self,
        contract: &Contract,
    ) -> Result<(RequestId, oneshot::Receiver<Completion>)> {
        let encoded = EncodedContract::encode(contract);
        let id = self.ids.next();
        let rx = self
            .registry
            .register(id, RequestKind::ContractDetails, RequestMode::Streaming)?;
        self.send(
            id,
            OutboundMessage::RequestContractDetails {
                request_id: id,
                contract: encoded,
            },
        )
        .await?;

        info!("Contract details {} requested for {}", id, contract.symbol);
        Ok((id, rx))
    }

    /// Start streaming market data for `contract`
    pub async fn subscribe_market_data(&self, contract: &Contract) -> Result<MarketDataSubscription> {
        let encoded = EncodedContract::encode(contract);
        let id = self.ids.next();
        let rx = self
            .registry
            .register_subscription(id, RequestKind::MarketDataSubscription)?;
        self.send(
            id,
            OutboundMessage::RequestMarketData {
                request_id: id,
                contract: encoded,
                snapshot: false,
            },
        )
        .await?;

        info!("Market data {} subscribed for {}", id, contract.symbol);
        Ok(MarketDataSubscription { id, rx })
    }

    /// Stop a market data subscription; its stream ends
    ///
    /// Fails with `InvalidMode` if `id` belongs to another kind of request.
    pub async fn unsubscribe(&self, id: RequestId) -> Result<()> {
        self.withdraw(id, RequestKind::MarketDataSubscription)?;
        self.transport
            .send(&OutboundMessage::CancelMarketData { request_id: id })
            .await?;
        info!("Market data {} unsubscribed", id);
        Ok(())
    }

    /// Remove `id` without fulfilment, provided it is a `kind` request
    ///
    /// An id that is no longer registered is not an error: the gateway may
    /// already have ended it.
    fn withdraw(&self, id: RequestId, kind: RequestKind) -> Result<()> {
        match self.registry.lookup(id) {
            Some(info) if info.kind != kind => {
                warn!(
                    "Refusing to withdraw {} request {} as {}",
                    info.kind.name(),
                    id,
                    kind.name()
                );
                Err(RequestError::InvalidMode)
            }
            Some(_) => {
                self.registry.cancel(id);
                Ok(())
            }
            None => {
                debug!("{} request {} is not active", kind.name(), id);
                Ok(())
            }
        }
    }

    async fn send(&self, id: RequestId, msg: OutboundMessage) -> Result<()> {
        if let Err(e) = self.transport.send(&msg).await {
            warn!("Failed to send {} for request {}: {}", msg.name(), id, e);
            self.registry.cancel(id);
            return Err(e.into());
        }
        Ok(())
    }

    fn handle<T>(
        &self,
        id: RequestId,
        kind: RequestKind,
        rx: oneshot::Receiver<Completion>,
        convert: Convert<T>,
    ) -> RequestHandle<T> {
        RequestHandle {
            id,
            kind,
            rx,
            convert,
            default_timeout: self.default_timeout,
        }
    }
}

fn order_outcome(id: RequestId, response: Response) -> Result<OrderOutcome> {
    match response {
        Response::Single(ResponsePayload::OrderStatus(update)) => Ok(OrderOutcome::Terminal(update)),
        Response::Single(ResponsePayload::Cancellation(CancelOutcome::Cancelled { message })) => {
            Ok(OrderOutcome::CancelAcknowledged { message })
        }
        _ => Err(RequestError::UnexpectedPayload {
            id,
            expected: "order status",
        }),
    }
}

fn cancel_outcome(id: RequestId, response: Response) -> Result<CancelOutcome> {
    match response {
        Response::Single(ResponsePayload::Cancellation(outcome)) => Ok(outcome),
        _ => Err(RequestError::UnexpectedPayload {
            id,
            expected: "cancellation",
        }),
    }
}

fn bars(id: RequestId, response: Response) -> Result<Vec<Bar>> {
    let Response::Sequence(items) = response else {
        return Err(RequestError::UnexpectedPayload { id, expected: "bars" });
    };
    items
        .into_iter()
        .map(|item| match item {
            ResponsePayload::Bar(bar) => Ok(bar),
            _ => Err(RequestError::UnexpectedPayload { id, expected: "bar" }),
        })
        .collect()
}

fn contract_details(id: RequestId, response: Response) -> Result<Vec<ContractDetails>> {
    let Response::Sequence(items) = response else {
        return Err(RequestError::UnexpectedPayload {
            id,
            expected: "contract details",
        });
    };
    items
        .into_iter()
        .map(|item| match item {
            ResponsePayload::ContractDetails(details) => Ok(details),
            _ => Err(RequestError::UnexpectedPayload {
                id,
                expected: "contract details",
            }),
        })
        .collect()
}

fn single_contract_details(id: RequestId, response: Response) -> Result<ContractDetails> {
    let mut all = contract_details(id, response)?;
    match all.len() {
        0 => Err(RequestError::ContractNotFound(id)),
        1 => Ok(all.remove(0)),
        n => Err(RequestError::AmbiguousContract {
            code: 200,
            message: format!("{} contracts match request {}", n, id),
        }),
    }
}
