//! Callback dispatcher
//!
//! Single intake point for every event the transport delivers. Events are
//! handled one at a time, in receipt order; correlation is purely by request id.
//!
//! ```text
//! Transport ──► GatewayEvent ──► CallbackDispatcher ──┬──► Registry.append / resolve / fail
//!                                    │                └──► ErrorClassifier
//!                                    └──────────────────► Notification (general listener)
//! ```

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{broadcast, mpsc};
use tws_core::{OrderStatusUpdate, RequestId};

use crate::classifier::{Classification, ErrorClass, ErrorClassifier, ErrorScope, Notice};
use crate::error::RequestError;
use crate::messages::{CancelOutcome, GatewayEvent, Notification, ResponsePayload};
use crate::registry::{PendingRequestRegistry, RequestKind};
use crate::request_id::RequestIdGenerator;

/// Routes gateway callbacks to pending requests
pub struct CallbackDispatcher {
    registry: Arc<PendingRequestRegistry>,
    ids: Arc<RequestIdGenerator>,
    classifier: ErrorClassifier,
    /// General-purpose listener for events that complete no request
    listener: broadcast::Sender<Notification>,
}

impl CallbackDispatcher {
    pub fn new(
        registry: Arc<PendingRequestRegistry>,
        ids: Arc<RequestIdGenerator>,
        classifier: ErrorClassifier,
        listener: broadcast::Sender<Notification>,
    ) -> Self {
        Self {
            registry,
            ids,
            classifier,
            listener,
        }
    }

    /// Subscribe to notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.listener.subscribe()
    }

    /// Consume events until the transport's event stream ends
    ///
    /// When the stream ends the connection is gone: the registry is closed and
    /// every outstanding request fails with `ConnectionLost`.
    pub async fn run(self, mut events: mpsc::Receiver<GatewayEvent>) {
        info!("Callback dispatcher started");

        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }

        let failed = self
            .registry
            .close(RequestError::connection_lost("event stream closed"));
        info!(
            "Callback dispatcher stopped, {} pending requests failed",
            failed
        );
    }

    /// Handle one event
    pub fn dispatch(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::NextValidId(next) => {
                debug!("Next valid id {}", next);
                self.ids.advance_to(next);
                self.notify(Notification::NextValidId(next));
            }
            GatewayEvent::OrderStatus(update) => self.on_order_status(update),
            GatewayEvent::HistoricalBar { request_id, bar } => {
                self.on_partial(request_id, RequestKind::HistoricalData, ResponsePayload::Bar(bar));
            }
            GatewayEvent::HistoricalDataEnd { request_id } => {
                self.on_end(request_id, RequestKind::HistoricalData);
            }
            GatewayEvent::ContractDetails {
                request_id,
                details,
            } => {
                self.on_partial(
                    request_id,
                    RequestKind::ContractDetails,
                    ResponsePayload::ContractDetails(details),
                );
            }
            GatewayEvent::ContractDetailsEnd { request_id } => {
                self.on_end(request_id, RequestKind::ContractDetails);
            }
            GatewayEvent::Tick { request_id, tick } => {
                self.on_partial(
                    request_id,
                    RequestKind::MarketDataSubscription,
                    ResponsePayload::Tick(tick),
                );
            }
            GatewayEvent::Error {
                request_id,
                code,
                message,
            } => {
                let classification = self.classifier.classify(code, request_id, &message);
                self.on_error(classification);
            }
            GatewayEvent::ConnectionClosed { reason } => {
                error!("Connection closed: {}", reason);
                let failed = self
                    .registry
                    .close(RequestError::connection_lost(reason.clone()));
                self.notify(Notification::ConnectionLost { reason, failed });
            }
        }
    }

    /// True if `id` is registered with the kind the callback implies
    fn expects(&self, id: RequestId, kind: RequestKind) -> bool {
        match self.registry.lookup(id) {
            Some(info) if info.kind == kind => true,
            Some(info) => {
                warn!(
                    "{} callback for request {} which is a {} request, ignored",
                    kind.name(),
                    id,
                    info.kind.name()
                );
                false
            }
            None => {
                debug!("{} callback for unknown request {} ignored", kind.name(), id);
                false
            }
        }
    }

    fn on_partial(&self, id: RequestId, kind: RequestKind, payload: ResponsePayload) {
        if self.expects(id, kind) {
            self.registry.append(id, payload);
        }
    }

    fn on_end(&self, id: RequestId, kind: RequestKind) {
        if self.expects(id, kind) {
            self.registry.resolve(id, None);
        }
    }

    fn on_order_status(&self, update: OrderStatusUpdate) {
        let order_id = update.order_id;
        debug!("Order {} status {}", order_id, update.state.as_str());

        if update.state.is_cancelled() {
            self.resolve_cancels(
                order_id,
                CancelOutcome::Cancelled {
                    message: format!("order {} {}", order_id, update.state.as_str()),
                },
            );
        }

        let awaited = matches!(
            self.registry.lookup(order_id),
            Some(info) if info.kind == RequestKind::PlaceOrder
        );
        if awaited && update.is_terminal() {
            self.registry
                .resolve(order_id, Some(ResponsePayload::OrderStatus(update)));
        } else {
            self.notify(Notification::OrderStatus(update));
        }
    }

    /// Complete every pending cancel targeting `order_id`; returns how many
    fn resolve_cancels(&self, order_id: RequestId, outcome: CancelOutcome) -> usize {
        let cancels = self.registry.pending_cancels_for(order_id);
        for cancel_id in &cancels {
            debug!("Cancel request {} for order {} resolved: {:?}", cancel_id, order_id, outcome);
            self.registry
                .resolve(*cancel_id, Some(ResponsePayload::Cancellation(outcome.clone())));
        }
        cancels.len()
    }

    fn on_error(&self, c: Classification) {
        let id = match c.scope {
            ErrorScope::Global => return self.on_global_error(c),
            ErrorScope::Request(id) => id,
        };

        if c.class == ErrorClass::ConnectionFault {
            return self.on_global_error(c);
        }

        let Some(info) = self.registry.lookup(id) else {
            // the id may be an order whose cancels are still pending
            let resolved = match c.class {
                ErrorClass::Informational(Notice::OrderCancelled) => self.resolve_cancels(
                    id,
                    CancelOutcome::Cancelled {
                        message: c.message.clone(),
                    },
                ),
                ErrorClass::AlreadyTerminal => self.resolve_cancels(
                    id,
                    CancelOutcome::AlreadyTerminal {
                        message: c.message.clone(),
                    },
                ),
                _ => 0,
            };
            if resolved == 0 {
                warn!(
                    "Error {} for unknown request {}: {}",
                    c.code, id, c.message
                );
                self.forward(c);
            }
            return;
        };

        match (c.class, info.kind) {
            (ErrorClass::Informational(Notice::OrderCancelled), RequestKind::PlaceOrder) => {
                let outcome = CancelOutcome::Cancelled {
                    message: c.message.clone(),
                };
                self.resolve_cancels(id, outcome.clone());
                self.registry
                    .resolve(id, Some(ResponsePayload::Cancellation(outcome)));
            }
            (
                ErrorClass::Informational(Notice::OrderCancelled),
                RequestKind::CancelOrder { order_id },
            ) => {
                let outcome = CancelOutcome::Cancelled {
                    message: c.message.clone(),
                };
                self.registry
                    .resolve(id, Some(ResponsePayload::Cancellation(outcome.clone())));
                if self.registry.lookup(order_id).map(|i| i.kind) == Some(RequestKind::PlaceOrder) {
                    self.registry
                        .resolve(order_id, Some(ResponsePayload::Cancellation(outcome)));
                }
            }
            (ErrorClass::AlreadyTerminal, RequestKind::CancelOrder { .. }) => {
                self.registry.resolve(
                    id,
                    Some(ResponsePayload::Cancellation(CancelOutcome::AlreadyTerminal {
                        message: c.message.clone(),
                    })),
                );
            }
            (ErrorClass::AlreadyTerminal, RequestKind::PlaceOrder) => {
                // the order's own terminal status is still on its way
                let resolved = self.resolve_cancels(
                    id,
                    CancelOutcome::AlreadyTerminal {
                        message: c.message.clone(),
                    },
                );
                if resolved == 0 {
                    self.forward(c);
                }
            }
            (ErrorClass::Informational(_) | ErrorClass::AlreadyTerminal, _) => {
                debug!(
                    "Notice {} for {} request {}: {}",
                    c.code,
                    info.kind.name(),
                    id,
                    c.message
                );
                self.forward(c);
            }
            (ErrorClass::RequestFailure(_) | ErrorClass::Unclassified, _) => {
                if c.class == ErrorClass::Unclassified {
                    warn!(
                        "Unclassified error {} for {} request {}: {}",
                        c.code,
                        info.kind.name(),
                        id,
                        c.message
                    );
                }
                if let Some(err) = c.request_error() {
                    self.registry.fail(id, err);
                }
            }
            (ErrorClass::ConnectionFault, _) => self.on_global_error(c),
        }
    }

    fn on_global_error(&self, c: Classification) {
        match c.class {
            ErrorClass::ConnectionFault => {
                error!("Connection fault {}: {}", c.code, c.message);
                let reason = format!("{} (code {})", c.message, c.code);
                let failed = self
                    .registry
                    .fail_all(RequestError::connection_lost(reason.clone()));
                self.forward(c);
                self.notify(Notification::ConnectionLost { reason, failed });
            }
            ErrorClass::Unclassified => {
                warn!("Unclassified global error {}: {}", c.code, c.message);
                self.forward(c);
            }
            _ => {
                info!("Gateway notice {}: {}", c.code, c.message);
                self.forward(c);
            }
        }
    }

    fn forward(&self, c: Classification) {
        let request_id = match c.scope {
            ErrorScope::Request(id) => Some(id),
            ErrorScope::Global => None,
        };
        self.notify(Notification::Error {
            request_id,
            code: c.code,
            message: c.message,
            class: c.class,
        });
    }

    fn notify(&self, notification: Notification) {
        if self.listener.send(notification).is_err() {
            debug!("No notification listeners");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Completion, Response};
    use crate::registry::RequestMode;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tokio::sync::oneshot;
    use tws_core::{Bar, OrderState};

    struct Fixture {
        registry: Arc<PendingRequestRegistry>,
        ids: Arc<RequestIdGenerator>,
        dispatcher: CallbackDispatcher,
        notifications: broadcast::Receiver<Notification>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(PendingRequestRegistry::new());
        let ids = Arc::new(RequestIdGenerator::new());
        let (tx, notifications) = broadcast::channel(64);
        let dispatcher =
            CallbackDispatcher::new(registry.clone(), ids.clone(), ErrorClassifier::new(), tx);
        Fixture {
            registry,
            ids,
            dispatcher,
            notifications,
        }
    }

    fn id(n: u64) -> RequestId {
        RequestId::new(n)
    }

    fn register(f: &Fixture, n: u64, kind: RequestKind, mode: RequestMode) -> oneshot::Receiver<Completion> {
        f.registry.register(id(n), kind, mode).unwrap()
    }

    fn bar(close: rust_decimal::Decimal) -> Bar {
        Bar {
            time: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(10),
            wap: close,
            count: 1,
        }
    }

    #[test]
    fn test_next_valid_id_advances_generator() {
        let mut f = fixture();
        f.dispatcher.dispatch(GatewayEvent::NextValidId(id(1000)));
        assert_eq!(f.ids.next(), id(1000));
        assert_eq!(
            f.notifications.try_recv().unwrap(),
            Notification::NextValidId(id(1000))
        );
    }

    #[tokio::test]
    async fn test_non_terminal_status_goes_to_listener() {
        let mut f = fixture();
        let rx = register(&f, 1, RequestKind::PlaceOrder, RequestMode::SingleShot);

        let submitted = OrderStatusUpdate::new(id(1), OrderState::Submitted, dec!(100));
        f.dispatcher.dispatch(GatewayEvent::OrderStatus(submitted.clone()));
        assert!(f.registry.contains(id(1)));
        assert_eq!(
            f.notifications.try_recv().unwrap(),
            Notification::OrderStatus(submitted)
        );

        let filled = OrderStatusUpdate::filled(id(1), dec!(100), dec!(12.5));
        f.dispatcher.dispatch(GatewayEvent::OrderStatus(filled.clone()));
        assert_eq!(
            rx.await.unwrap(),
            Ok(Response::Single(ResponsePayload::OrderStatus(filled)))
        );
    }

    #[tokio::test]
    async fn test_mismatched_kind_is_ignored() {
        let f = fixture();
        let rx = register(&f, 2, RequestKind::ContractDetails, RequestMode::Streaming);

        f.dispatcher.dispatch(GatewayEvent::HistoricalBar {
            request_id: id(2),
            bar: bar(dec!(1)),
        });
        f.dispatcher
            .dispatch(GatewayEvent::HistoricalDataEnd { request_id: id(2) });
        assert_eq!(f.registry.lookup(id(2)).unwrap().accumulated, 0);

        f.dispatcher
            .dispatch(GatewayEvent::ContractDetailsEnd { request_id: id(2) });
        assert_eq!(rx.await.unwrap(), Ok(Response::Sequence(Vec::new())));
    }

    #[tokio::test]
    async fn test_already_terminal_resolves_cancel() {
        let f = fixture();
        let rx = register(
            &f,
            7,
            RequestKind::CancelOrder { order_id: id(3) },
            RequestMode::SingleShot,
        );

        f.dispatcher.dispatch(GatewayEvent::error(
            7,
            161,
            "Cancel attempted when order is not in a cancellable state",
        ));

        match rx.await.unwrap() {
            Ok(Response::Single(ResponsePayload::Cancellation(
                CancelOutcome::AlreadyTerminal { .. },
            ))) => {}
            other => panic!("unexpected completion {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_ack_on_order_id_resolves_both() {
        let f = fixture();
        let order_rx = register(&f, 3, RequestKind::PlaceOrder, RequestMode::SingleShot);
        let cancel_rx = register(
            &f,
            4,
            RequestKind::CancelOrder { order_id: id(3) },
            RequestMode::SingleShot,
        );

        f.dispatcher
            .dispatch(GatewayEvent::error(3, 202, "Order Canceled - reason:"));

        assert!(matches!(
            order_rx.await.unwrap(),
            Ok(Response::Single(ResponsePayload::Cancellation(
                CancelOutcome::Cancelled { .. }
            )))
        ));
        assert!(matches!(
            cancel_rx.await.unwrap(),
            Ok(Response::Single(ResponsePayload::Cancellation(
                CancelOutcome::Cancelled { .. }
            )))
        ));
        assert!(f.registry.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_status_resolves_pending_cancel() {
        let f = fixture();
        let order_rx = register(&f, 3, RequestKind::PlaceOrder, RequestMode::SingleShot);
        let cancel_rx = register(
            &f,
            4,
            RequestKind::CancelOrder { order_id: id(3) },
            RequestMode::SingleShot,
        );

        let cancelled = OrderStatusUpdate::new(id(3), OrderState::Cancelled, dec!(100));
        f.dispatcher
            .dispatch(GatewayEvent::OrderStatus(cancelled.clone()));

        assert_eq!(
            order_rx.await.unwrap(),
            Ok(Response::Single(ResponsePayload::OrderStatus(cancelled)))
        );
        assert!(matches!(
            cancel_rx.await.unwrap(),
            Ok(Response::Single(ResponsePayload::Cancellation(
                CancelOutcome::Cancelled { .. }
            )))
        ));
    }

    #[tokio::test]
    async fn test_unclassified_error_fails_request() {
        let f = fixture();
        let rx = register(&f, 5, RequestKind::HistoricalData, RequestMode::Streaming);

        f.dispatcher.dispatch(GatewayEvent::error(
            5,
            162,
            "Historical Market Data Service error message",
        ));

        assert_eq!(
            rx.await.unwrap(),
            Err(RequestError::Protocol {
                code: 162,
                message: "Historical Market Data Service error message".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_informational_global_error_does_not_fail() {
        let mut f = fixture();
        let _rx = register(&f, 1, RequestKind::HistoricalData, RequestMode::Streaming);

        f.dispatcher.dispatch(GatewayEvent::error(
            -1,
            2104,
            "Market data farm connection is OK:usfarm",
        ));

        assert!(f.registry.contains(id(1)));
        match f.notifications.try_recv().unwrap() {
            Notification::Error {
                request_id, class, ..
            } => {
                assert_eq!(request_id, None);
                assert_eq!(class, ErrorClass::Informational(Notice::DataFarmStatus));
            }
            other => panic!("unexpected notification {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_for_unknown_id_forwarded() {
        let mut f = fixture();
        f.dispatcher
            .dispatch(GatewayEvent::error(42, 387, "Unsupported order type"));
        assert!(matches!(
            f.notifications.try_recv().unwrap(),
            Notification::Error { code: 387, .. }
        ));
    }

    #[tokio::test]
    async fn test_connection_closed_closes_registry() {
        let mut f = fixture();
        let rx = register(&f, 1, RequestKind::PlaceOrder, RequestMode::SingleShot);

        f.dispatcher.dispatch(GatewayEvent::ConnectionClosed {
            reason: "peer reset".to_string(),
        });

        assert!(matches!(rx.await.unwrap(), Err(RequestError::ConnectionLost { .. })));
        assert!(f.registry.is_closed());
        assert_eq!(
            f.notifications.try_recv().unwrap(),
            Notification::ConnectionLost {
                reason: "peer reset".to_string(),
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_run_closes_registry_when_events_end() {
        let f = fixture();
        let rx = register(&f, 1, RequestKind::ContractDetails, RequestMode::Streaming);
        let registry = f.registry.clone();

        let (tx, events) = mpsc::channel(8);
        let task = tokio::spawn(f.dispatcher.run(events));
        drop(tx);
        task.await.unwrap();

        assert!(registry.is_closed());
        assert!(matches!(rx.await.unwrap(), Err(RequestError::ConnectionLost { .. })));
    }
}
