//! Routing committed changes to terminal groups.
//!
//! ```text
//! Created / Updated
//!   order has counters {c1, c2, ..}  ──► Counter(ci): order reduced to ci's items
//!   order has no counters            ──► All: order as is
//!
//! StatusChanged
//!   order has counters {c1, c2, ..}  ──► Counter(ci): order_status_update
//!                                        Counter(ci): order reduced to ci's items
//!                                        All: order_status_update, only when an
//!                                             All terminal made the change
//!   order has no counters            ──► All: order_status_update
//!
//! Removed / Cleared                  ──► nothing
//! ```

use std::sync::Arc;
use std::time::Instant;

use common::ConnectionId;
use domain::{Order, OrderChange};
use tokio::sync::mpsc::error::TrySendError;

use crate::message::OutboundMessage;
use crate::subscription::{Interest, Outbox, SubscriptionRegistry};
use crate::view::view_for;
use crate::{FanoutError, Result};

/// One message bound for every member of one interest group.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub interest: Interest,
    pub message: OutboundMessage,
}

/// Outcome of fanning out one change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages accepted by an outbox.
    pub delivered: usize,
    /// Connections dropped because their outbox was full.
    pub evicted: usize,
    /// Messages for connections that closed before delivery.
    pub skipped: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.evicted += other.evicted;
        self.skipped += other.skipped;
    }
}

/// Computes the deliveries for a change.
///
/// `origin` is the interest of the terminal that made the change, if a
/// terminal made it.
pub fn plan(change: &OrderChange, origin: Option<Interest>) -> Vec<Delivery> {
    match change {
        OrderChange::Created(order) => {
            per_group(order, |order| OutboundMessage::NewOrder { order })
        }
        OrderChange::Updated(order) => {
            per_group(order, |order| OutboundMessage::OrderUpdate { order })
        }
        OrderChange::StatusChanged(order) => plan_status_change(order, origin),
        OrderChange::Removed(_) | OrderChange::Cleared => Vec::new(),
    }
}

fn per_group(order: &Order, wrap: impl Fn(Order) -> OutboundMessage) -> Vec<Delivery> {
    let counters = order.counters();
    if counters.is_empty() {
        return vec![Delivery {
            interest: Interest::All,
            message: wrap(order.clone()),
        }];
    }

    counters
        .into_iter()
        .filter_map(|counter_id| {
            let interest = Interest::Counter(counter_id);
            view_for(order, interest).map(|view| Delivery {
                interest,
                message: wrap(view),
            })
        })
        .collect()
}

fn plan_status_change(order: &Order, origin: Option<Interest>) -> Vec<Delivery> {
    let status = OutboundMessage::OrderStatusUpdate {
        order_id: order.id,
        status: order.status(),
    };

    let counters = order.counters();
    if counters.is_empty() {
        return vec![Delivery {
            interest: Interest::All,
            message: status,
        }];
    }

    let mut deliveries = Vec::with_capacity(counters.len() * 2 + 1);
    for counter_id in counters {
        let interest = Interest::Counter(counter_id);
        deliveries.push(Delivery {
            interest,
            message: status.clone(),
        });
        if let Some(view) = view_for(order, interest) {
            deliveries.push(Delivery {
                interest,
                message: OutboundMessage::OrderUpdate { order: view },
            });
        }
    }
    if origin == Some(Interest::All) {
        deliveries.push(Delivery {
            interest: Interest::All,
            message: status,
        });
    }
    deliveries
}

/// Delivers changes to the terminals registered in a [`SubscriptionRegistry`].
///
/// Delivery never waits. A connection whose outbox is full has fallen behind
/// and is evicted from the registry; dropping its outbox ends the session, and
/// the terminal reconnects for a fresh snapshot.
#[derive(Debug, Clone)]
pub struct BroadcastRouter {
    subscriptions: SubscriptionRegistry,
}

impl BroadcastRouter {
    /// Creates a router over a subscription registry.
    pub fn new(subscriptions: SubscriptionRegistry) -> Self {
        Self { subscriptions }
    }

    /// Fans out a change made outside any terminal.
    pub async fn dispatch(&self, change: &OrderChange) -> DispatchReport {
        self.dispatch_with_origin(change, None).await
    }

    /// Fans out a change, echoing status changes to the origin's group.
    #[tracing::instrument(skip(self, change), fields(kind = change.kind(), order_id = ?change.order_id()))]
    pub async fn dispatch_with_origin(
        &self,
        change: &OrderChange,
        origin: Option<Interest>,
    ) -> DispatchReport {
        let started = Instant::now();
        let mut report = DispatchReport::default();

        for delivery in plan(change, origin) {
            let targets = self.subscriptions.outboxes_for(delivery.interest).await;
            if targets.is_empty() {
                continue;
            }
            report.merge(self.deliver(delivery, targets).await);
        }

        metrics::histogram!("fanout_dispatch_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        metrics::counter!("fanout_deliveries_total").increment(report.delivered as u64);
        if report.evicted > 0 {
            metrics::counter!("fanout_delivery_failures_total").increment(report.evicted as u64);
        }
        tracing::debug!(
            delivered = report.delivered,
            evicted = report.evicted,
            skipped = report.skipped,
            "change dispatched"
        );
        report
    }

    async fn deliver(
        &self,
        delivery: Delivery,
        targets: Vec<(ConnectionId, Outbox)>,
    ) -> DispatchReport {
        let message = Arc::new(delivery.message);
        let mut report = DispatchReport::default();

        for (connection_id, outbox) in targets {
            match send(connection_id, &outbox, Arc::clone(&message)) {
                Ok(()) => report.delivered += 1,
                Err(FanoutError::Closed(connection_id)) => {
                    tracing::debug!(%connection_id, "connection closed before delivery");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, interest = %delivery.interest, "evicting terminal");
                    drop(outbox);
                    self.subscriptions.leave(connection_id).await;
                    report.evicted += 1;
                }
            }
        }
        report
    }
}

fn send(connection_id: ConnectionId, outbox: &Outbox, message: Arc<OutboundMessage>) -> Result<()> {
    outbox.try_send(message).map_err(|e| match e {
        TrySendError::Full(_) => FanoutError::Lagging(connection_id),
        TrySendError::Closed(_) => FanoutError::Closed(connection_id),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{CounterId, OrderId};
    use domain::{Money, NewItem, NewOrder, OrderStatus};

    use super::*;

    fn order_on(counters: &[u32]) -> Order {
        let new_order = counters.iter().fold(NewOrder::new(), |order, c| {
            order.item(
                NewItem::new(format!("Item {c}"), "any", Money::zero(), 1)
                    .assigned_to(CounterId::new(*c)),
            )
        });
        Order::create(OrderId::new(1), new_order, Utc::now())
    }

    fn unassigned_order() -> Order {
        Order::create(
            OrderId::new(2),
            NewOrder::new().item(NewItem::new("Soup", "soups", Money::zero(), 1)),
            Utc::now(),
        )
    }

    fn interests(deliveries: &[Delivery]) -> Vec<Interest> {
        deliveries.iter().map(|d| d.interest).collect()
    }

    #[test]
    fn test_created_goes_to_each_counter_filtered() {
        let order = order_on(&[1, 2, 1]);
        let deliveries = plan(&OrderChange::Created(order), None);

        assert_eq!(
            interests(&deliveries),
            vec![
                Interest::Counter(CounterId::new(1)),
                Interest::Counter(CounterId::new(2))
            ]
        );
        match &deliveries[0].message {
            OutboundMessage::NewOrder { order } => {
                assert_eq!(order.items().len(), 2);
                assert!(order.items().iter().all(|i| i.is_for(CounterId::new(1))));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_unassigned_order_takes_global_path() {
        let order = unassigned_order();
        let deliveries = plan(&OrderChange::Updated(order.clone()), None);
        assert_eq!(
            deliveries,
            vec![Delivery {
                interest: Interest::All,
                message: OutboundMessage::OrderUpdate { order },
            }]
        );
    }

    #[test]
    fn test_counter_scoped_changes_are_not_mirrored_to_all() {
        let order = order_on(&[1]);
        let deliveries = plan(&OrderChange::Created(order), Some(Interest::All));
        assert!(!interests(&deliveries).contains(&Interest::All));
    }

    #[test]
    fn test_status_change_sends_status_and_filtered_order() {
        let mut order = order_on(&[1, 2]);
        order.set_status(OrderStatus::InProgress);
        let deliveries = plan(&OrderChange::StatusChanged(order), None);

        assert_eq!(deliveries.len(), 4);
        let status = OutboundMessage::OrderStatusUpdate {
            order_id: OrderId::new(1),
            status: OrderStatus::InProgress,
        };
        assert_eq!(deliveries[0].message, status);
        assert!(matches!(
            deliveries[1].message,
            OutboundMessage::OrderUpdate { .. }
        ));
        assert!(!interests(&deliveries).contains(&Interest::All));
    }

    #[test]
    fn test_status_change_from_all_terminal_is_echoed_to_all() {
        let order = order_on(&[1]);
        let deliveries = plan(&OrderChange::StatusChanged(order), Some(Interest::All));
        let last = deliveries.last().unwrap();
        assert_eq!(last.interest, Interest::All);
        assert!(matches!(
            last.message,
            OutboundMessage::OrderStatusUpdate { .. }
        ));
    }

    #[test]
    fn test_status_change_without_counters_goes_to_all_once() {
        let order = unassigned_order();
        let deliveries = plan(&OrderChange::StatusChanged(order), Some(Interest::All));
        assert_eq!(interests(&deliveries), vec![Interest::All]);
    }

    #[test]
    fn test_removals_produce_nothing() {
        assert!(plan(&OrderChange::Removed(OrderId::new(1)), None).is_empty());
        assert!(plan(&OrderChange::Cleared, Some(Interest::All)).is_empty());
    }

    #[tokio::test]
    async fn test_full_outbox_is_evicted_without_waiting() {
        let subscriptions = SubscriptionRegistry::new();
        let store = order_store::InMemoryOrderStore::new();
        let full = ConnectionId::new();
        let (full_tx, _full_rx) = tokio::sync::mpsc::channel(1);
        full_tx
            .try_send(Arc::new(OutboundMessage::InitialData { orders: vec![] }))
            .unwrap();
        let counter = Interest::Counter(CounterId::new(1));
        subscriptions.join(full, counter, full_tx, &store).await.unwrap();
        let (live_tx, mut live_rx) = tokio::sync::mpsc::channel(4);
        subscriptions
            .join(ConnectionId::new(), counter, live_tx, &store)
            .await
            .unwrap();

        let router = BroadcastRouter::new(subscriptions.clone());
        let report = router.dispatch(&OrderChange::Created(order_on(&[1]))).await;

        assert_eq!(
            report,
            DispatchReport {
                delivered: 1,
                evicted: 1,
                skipped: 0
            }
        );
        assert_eq!(subscriptions.interest_of(full).await, None);
        assert_eq!(subscriptions.connection_count().await, 1);
        assert_eq!(live_rx.try_recv().unwrap().kind(), "new_order");
    }
}
