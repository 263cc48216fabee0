//! Pending request registry
//!
//! Maps a request id to the state of one outstanding logical request. Callers
//! insert concurrently from any task; the dispatcher is the only consumer that
//! resolves, appends to, or fails entries, and it does so sequentially.
//!
//! Every terminal transition removes the entry first and only then fulfils its
//! completion, so an entry is fulfilled at most once and never touched after
//! removal. Fulfilling a completion whose receiver is gone (the caller stopped
//! waiting) is not an error: the value is simply discarded.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};
use tws_core::RequestId;

use crate::error::{RequestError, Result};
use crate::messages::{Completion, Response, ResponsePayload};

/// What a logical request is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    PlaceOrder,
    /// Cancellation of the order placed under `order_id`
    CancelOrder { order_id: RequestId },
    HistoricalData,
    ContractDetails,
    MarketDataSubscription,
}

impl RequestKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaceOrder => "PlaceOrder",
            Self::CancelOrder { .. } => "CancelOrder",
            Self::HistoricalData => "HistoricalData",
            Self::ContractDetails => "ContractDetails",
            Self::MarketDataSubscription => "MarketDataSubscription",
        }
    }
}

/// How a logical request is completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMode {
    /// One terminal payload
    SingleShot,
    /// Partial payloads accumulated until an end marker
    Streaming,
    /// Partial payloads forwarded live until withdrawn
    Subscription,
}

/// Item delivered on a subscription stream
pub type StreamItem = std::result::Result<ResponsePayload, RequestError>;

/// Completion sink of a pending request
enum Sink {
    Once(oneshot::Sender<Completion>),
    Stream(mpsc::UnboundedSender<StreamItem>),
}

struct PendingRequest {
    kind: RequestKind,
    mode: RequestMode,
    accumulator: Vec<ResponsePayload>,
    sink: Sink,
    created_at: DateTime<Utc>,
}

/// Read-only view of a pending request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub id: RequestId,
    pub kind: RequestKind,
    pub mode: RequestMode,
    /// Partial payloads accumulated so far (always 0 for single-shot and subscriptions)
    pub accumulated: usize,
    /// Diagnostics only; entries never expire
    pub created_at: DateTime<Utc>,
}

/// Connection-scoped map of outstanding requests
pub struct PendingRequestRegistry {
    entries: DashMap<RequestId, PendingRequest>,
    /// Set once the owning connection is torn down
    closed: AtomicBool,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a single-shot or streaming request
    ///
    /// Returns the receiving half of the request's completion.
    pub fn register(
        &self,
        id: RequestId,
        kind: RequestKind,
        mode: RequestMode,
    ) -> Result<oneshot::Receiver<Completion>> {
        if mode == RequestMode::Subscription {
            return Err(RequestError::InvalidMode);
        }
        let (tx, rx) = oneshot::channel();
        self.insert(id, kind, mode, Sink::Once(tx))?;
        Ok(rx)
    }

    /// Register a subscription whose payloads are forwarded as they arrive
    pub fn register_subscription(
        &self,
        id: RequestId,
        kind: RequestKind,
    ) -> Result<mpsc::UnboundedReceiver<StreamItem>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.insert(id, kind, RequestMode::Subscription, Sink::Stream(tx))?;
        Ok(rx)
    }

    fn insert(&self, id: RequestId, kind: RequestKind, mode: RequestMode, sink: Sink) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RequestError::connection_lost("connection closed"));
        }

        match self.entries.entry(id) {
            Entry::Occupied(_) => return Err(RequestError::DuplicateRequestId(id)),
            Entry::Vacant(slot) => {
                slot.insert(PendingRequest {
                    kind,
                    mode,
                    accumulator: Vec::new(),
                    sink,
                    created_at: Utc::now(),
                });
            }
        }

        // close() may have swept the map between the check above and the insert
        if self.closed.load(Ordering::SeqCst) {
            self.entries.remove(&id);
            return Err(RequestError::connection_lost("connection closed"));
        }

        debug!("Registered {} request {} ({:?})", kind.name(), id, mode);
        Ok(())
    }

    /// Complete a request
    ///
    /// Single-shot: fulfils with `payload`. Streaming: `payload` (if any) is the
    /// last element, and the full accumulated sequence is delivered. Subscription:
    /// the stream ends. Returns false if `id` is not registered.
    pub fn resolve(&self, id: RequestId, payload: Option<ResponsePayload>) -> bool {
        let Some((_, entry)) = self.entries.remove(&id) else {
            debug!("Resolve for unknown request {} ignored", id);
            return false;
        };

        let PendingRequest {
            kind,
            mode,
            mut accumulator,
            sink,
            ..
        } = entry;

        let completion = match (mode, payload) {
            (RequestMode::SingleShot, Some(payload)) => Ok(Response::Single(payload)),
            (RequestMode::SingleShot, None) => {
                warn!("Single-shot {} request {} resolved without a payload", kind.name(), id);
                Err(RequestError::UnexpectedPayload {
                    id,
                    expected: kind.name(),
                })
            }
            (RequestMode::Streaming, last) => {
                accumulator.extend(last);
                debug!(
                    "{} request {} complete with {} items",
                    kind.name(),
                    id,
                    accumulator.len()
                );
                Ok(Response::Sequence(accumulator))
            }
            (RequestMode::Subscription, last) => {
                if let (Some(payload), Sink::Stream(tx)) = (last, &sink) {
                    let _ = tx.send(Ok(payload));
                }
                debug!("Subscription {} ended by the gateway", id);
                return true;
            }
        };

        Self::deliver(id, sink, completion);
        true
    }

    /// Add a partial payload to a streaming request, or forward it on a subscription
    ///
    /// Returns false if `id` is not registered or is single-shot.
    pub fn append(&self, id: RequestId, payload: ResponsePayload) -> bool {
        let Some(mut entry) = self.entries.get_mut(&id) else {
            debug!("Append of {} for unknown request {} ignored", payload.kind(), id);
            return false;
        };

        match entry.mode {
            RequestMode::Streaming => {
                entry.accumulator.push(payload);
                true
            }
            RequestMode::Subscription => {
                if let Sink::Stream(tx) = &entry.sink {
                    if tx.send(Ok(payload)).is_err() {
                        debug!("Subscriber for {} dropped its stream", id);
                    }
                }
                true
            }
            RequestMode::SingleShot => {
                warn!(
                    "Partial {} for single-shot {} request {} ignored",
                    payload.kind(),
                    entry.kind.name(),
                    id
                );
                false
            }
        }
    }

    /// Fail a request with `error`; returns false if `id` is not registered
    pub fn fail(&self, id: RequestId, error: RequestError) -> bool {
        let Some((_, entry)) = self.entries.remove(&id) else {
            debug!("Failure for unknown request {} ignored: {}", id, error);
            return false;
        };

        debug!("{} request {} failed: {}", entry.kind.name(), id, error);
        Self::deliver(id, entry.sink, Err(error));
        true
    }

    /// Withdraw a request without fulfilling it
    ///
    /// A caller still waiting on it observes [`RequestError::Withdrawn`]; a
    /// subscription stream simply ends.
    pub fn cancel(&self, id: RequestId) -> bool {
        match self.entries.remove(&id) {
            Some((_, entry)) => {
                debug!("{} request {} withdrawn", entry.kind.name(), id);
                true
            }
            None => false,
        }
    }

    /// Fail every outstanding request with `error` and empty the registry
    ///
    /// Returns the number of requests failed.
    pub fn fail_all(&self, error: RequestError) -> usize {
        let ids: Vec<RequestId> = self.entries.iter().map(|e| *e.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, entry)) = self.entries.remove(&id) {
                Self::deliver(id, entry.sink, Err(error.clone()));
                failed += 1;
            }
        }
        failed
    }

    /// Tear down: reject further registrations and fail everything outstanding
    pub fn close(&self, error: RequestError) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        self.fail_all(error)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn lookup(&self, id: RequestId) -> Option<RequestInfo> {
        self.entries.get(&id).map(|entry| RequestInfo {
            id,
            kind: entry.kind,
            mode: entry.mode,
            accumulated: entry.accumulator.len(),
            created_at: entry.created_at,
        })
    }

    /// Pending cancel requests targeting `order_id`
    pub fn pending_cancels_for(&self, order_id: RequestId) -> Vec<RequestId> {
        let mut ids: Vec<RequestId> = self
            .entries
            .iter()
            .filter(|e| e.kind == RequestKind::CancelOrder { order_id })
            .map(|e| *e.key())
            .collect();
        ids.sort();
        ids
    }

    /// All outstanding requests, ordered by id
    pub fn snapshot(&self) -> Vec<RequestInfo> {
        let mut infos: Vec<RequestInfo> = self
            .entries
            .iter()
            .map(|entry| RequestInfo {
                id: *entry.key(),
                kind: entry.kind,
                mode: entry.mode,
                accumulated: entry.accumulator.len(),
                created_at: entry.created_at,
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn deliver(id: RequestId, sink: Sink, completion: Completion) {
        match sink {
            Sink::Once(tx) => {
                if tx.send(completion).is_err() {
                    debug!("Caller stopped waiting on request {}, result discarded", id);
                }
            }
            Sink::Stream(tx) => {
                if let Err(e) = completion {
                    if tx.send(Err(e)).is_err() {
                        debug!("Subscriber for {} dropped its stream, failure discarded", id);
                    }
                }
            }
        }
    }
}

impl Default for PendingRequestRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tws_core::{Bar, MarketTick, OrderStatusUpdate, TickType};

    fn id(n: u64) -> RequestId {
        RequestId::new(n)
    }

    fn bar(close: rust_decimal::Decimal) -> ResponsePayload {
        ResponsePayload::Bar(Bar {
            time: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(100),
            wap: close,
            count: 1,
        })
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = PendingRequestRegistry::new();
        let _rx = registry
            .register(id(1), RequestKind::PlaceOrder, RequestMode::SingleShot)
            .unwrap();
        let result = registry.register(id(1), RequestKind::HistoricalData, RequestMode::Streaming);
        assert_eq!(result.err(), Some(RequestError::DuplicateRequestId(id(1))));
        assert_eq!(registry.lookup(id(1)).unwrap().kind, RequestKind::PlaceOrder);
    }

    #[test]
    fn test_subscription_mode_needs_stream_registration() {
        let registry = PendingRequestRegistry::new();
        let result = registry.register(
            id(1),
            RequestKind::MarketDataSubscription,
            RequestMode::Subscription,
        );
        assert_eq!(result.err(), Some(RequestError::InvalidMode));
    }

    #[tokio::test]
    async fn test_single_shot_resolves_once() {
        let registry = PendingRequestRegistry::new();
        let rx = registry
            .register(id(5), RequestKind::PlaceOrder, RequestMode::SingleShot)
            .unwrap();

        let update = OrderStatusUpdate::filled(id(5), dec!(10), dec!(101));
        assert!(registry.resolve(id(5), Some(ResponsePayload::OrderStatus(update.clone()))));
        assert!(!registry.resolve(id(5), Some(ResponsePayload::OrderStatus(update.clone()))));
        assert!(registry.is_empty());

        let completion = rx.await.unwrap();
        assert_eq!(
            completion,
            Ok(Response::Single(ResponsePayload::OrderStatus(update)))
        );
    }

    #[tokio::test]
    async fn test_streaming_accumulates_in_order() {
        let registry = PendingRequestRegistry::new();
        let rx = registry
            .register(id(2), RequestKind::HistoricalData, RequestMode::Streaming)
            .unwrap();

        for close in [dec!(1), dec!(2), dec!(3)] {
            assert!(registry.append(id(2), bar(close)));
        }
        assert_eq!(registry.lookup(id(2)).unwrap().accumulated, 3);
        assert!(registry.resolve(id(2), None));

        // late partial after the end marker changes nothing
        assert!(!registry.append(id(2), bar(dec!(4))));

        match rx.await.unwrap() {
            Ok(Response::Sequence(items)) => {
                assert_eq!(items, vec![bar(dec!(1)), bar(dec!(2)), bar(dec!(3))]);
            }
            other => panic!("unexpected completion {:?}", other),
        }
    }

    #[test]
    fn test_append_to_single_shot_ignored() {
        let registry = PendingRequestRegistry::new();
        let _rx = registry
            .register(id(3), RequestKind::PlaceOrder, RequestMode::SingleShot)
            .unwrap();
        assert!(!registry.append(id(3), bar(dec!(1))));
        assert!(registry.contains(id(3)));
    }

    #[tokio::test]
    async fn test_single_shot_without_payload_fails() {
        let registry = PendingRequestRegistry::new();
        let rx = registry
            .register(id(3), RequestKind::PlaceOrder, RequestMode::SingleShot)
            .unwrap();
        assert!(registry.resolve(id(3), None));
        assert!(matches!(
            rx.await.unwrap(),
            Err(RequestError::UnexpectedPayload { .. })
        ));
    }

    #[tokio::test]
    async fn test_fail_and_absent_ids() {
        let registry = PendingRequestRegistry::new();
        let rx = registry
            .register(id(8), RequestKind::ContractDetails, RequestMode::Streaming)
            .unwrap();

        assert!(!registry.fail(id(99), RequestError::InvalidMode));
        assert!(registry.fail(
            id(8),
            RequestError::Protocol {
                code: 321,
                message: "bad request".to_string()
            }
        ));
        assert!(matches!(rx.await.unwrap(), Err(RequestError::Protocol { code: 321, .. })));
    }

    #[test]
    fn test_resolve_after_receiver_dropped_is_harmless() {
        let registry = PendingRequestRegistry::new();
        let rx = registry
            .register(id(4), RequestKind::PlaceOrder, RequestMode::SingleShot)
            .unwrap();
        drop(rx);

        let update = OrderStatusUpdate::filled(id(4), dec!(1), dec!(1));
        assert!(registry.resolve(id(4), Some(ResponsePayload::OrderStatus(update))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_fail_after_subscriber_dropped_is_harmless() {
        let registry = PendingRequestRegistry::new();
        let rx = registry
            .register_subscription(id(5), RequestKind::MarketDataSubscription)
            .unwrap();
        drop(rx);

        assert!(registry.fail(id(5), RequestError::connection_lost("gone")));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_does_not_fulfil() {
        let registry = PendingRequestRegistry::new();
        let rx = registry
            .register(id(6), RequestKind::HistoricalData, RequestMode::Streaming)
            .unwrap();
        assert!(registry.cancel(id(6)));
        assert!(!registry.cancel(id(6)));
        // sender dropped without a value
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_subscription_forwards_live() {
        let registry = PendingRequestRegistry::new();
        let mut rx = registry
            .register_subscription(id(7), RequestKind::MarketDataSubscription)
            .unwrap();

        let tick = MarketTick::new(TickType::Bid, dec!(99.5), Utc::now());
        assert!(registry.append(id(7), ResponsePayload::Tick(tick.clone())));
        assert_eq!(rx.recv().await, Some(Ok(ResponsePayload::Tick(tick))));
        assert_eq!(registry.lookup(id(7)).unwrap().accumulated, 0);

        assert!(registry.cancel(id(7)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_fail_all_clears_registry() {
        let registry = PendingRequestRegistry::new();
        let rx1 = registry
            .register(id(1), RequestKind::PlaceOrder, RequestMode::SingleShot)
            .unwrap();
        let rx2 = registry
            .register(id(2), RequestKind::HistoricalData, RequestMode::Streaming)
            .unwrap();
        let mut sub = registry
            .register_subscription(id(3), RequestKind::MarketDataSubscription)
            .unwrap();

        let failed = registry.fail_all(RequestError::connection_lost("socket reset"));
        assert_eq!(failed, 3);
        assert!(registry.is_empty());

        for rx in [rx1, rx2] {
            assert!(matches!(rx.await.unwrap(), Err(RequestError::ConnectionLost { .. })));
        }
        assert!(matches!(sub.recv().await, Some(Err(RequestError::ConnectionLost { .. }))));
        assert_eq!(sub.recv().await, None);

        // a fault is not a teardown: new requests are still accepted
        assert!(registry
            .register(id(4), RequestKind::PlaceOrder, RequestMode::SingleShot)
            .is_ok());
    }

    #[test]
    fn test_close_rejects_new_registrations() {
        let registry = PendingRequestRegistry::new();
        registry.close(RequestError::connection_lost("disconnect"));
        assert!(registry.is_closed());
        assert!(matches!(
            registry.register(id(1), RequestKind::PlaceOrder, RequestMode::SingleShot),
            Err(RequestError::ConnectionLost { .. })
        ));
    }

    #[test]
    fn test_pending_cancels_for_order() {
        let registry = PendingRequestRegistry::new();
        let _a = registry
            .register(id(1), RequestKind::PlaceOrder, RequestMode::SingleShot)
            .unwrap();
        let _b = registry
            .register(
                id(3),
                RequestKind::CancelOrder { order_id: id(1) },
                RequestMode::SingleShot,
            )
            .unwrap();
        let _c = registry
            .register(
                id(2),
                RequestKind::CancelOrder { order_id: id(1) },
                RequestMode::SingleShot,
            )
            .unwrap();
        let _d = registry
            .register(
                id(4),
                RequestKind::CancelOrder { order_id: id(9) },
                RequestMode::SingleShot,
            )
            .unwrap();

        assert_eq!(registry.pending_cancels_for(id(1)), vec![id(2), id(3)]);
        let ids: Vec<_> = registry.snapshot().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![id(1), id(2), id(3), id(4)]);
    }
}
