//! Single consumer of published order changes.
//!
//! Handlers publish changes after their mutation commits. Two handlers
//! touching the same order may publish in the opposite order to their
//! commits, so the dispatcher remembers the last revision it sent for each
//! order and drops anything older. Removed orders keep a tombstone so a late
//! update cannot resurrect them on a terminal.

use std::collections::HashMap;

use common::OrderId;
use domain::OrderChange;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::router::{BroadcastRouter, DispatchReport};
use crate::subscription::Interest;

/// Revision recorded for removed orders. Order ids are never reused, so no
/// later change for the id can be newer.
const REMOVED: u64 = u64::MAX;

#[derive(Debug)]
struct Published {
    change: OrderChange,
    origin: Option<Interest>,
}

/// Handle for publishing committed changes to the dispatcher.
#[derive(Debug, Clone)]
pub struct ChangePublisher {
    tx: mpsc::UnboundedSender<Published>,
}

impl ChangePublisher {
    /// Publishes a change made outside any terminal.
    ///
    /// Returns false if the dispatcher has stopped.
    pub fn publish(&self, change: OrderChange) -> bool {
        self.publish_from(change, None)
    }

    /// Publishes a change made by a terminal with the given interest.
    pub fn publish_from(&self, change: OrderChange, origin: Option<Interest>) -> bool {
        let kind = change.kind();
        if self.tx.send(Published { change, origin }).is_err() {
            tracing::warn!(kind, "dispatcher stopped, change not broadcast");
            return false;
        }
        true
    }
}

/// Consumes published changes in FIFO order and fans them out.
pub struct Dispatcher {
    rx: mpsc::UnboundedReceiver<Published>,
    router: BroadcastRouter,
    last_dispatched: HashMap<OrderId, u64>,
}

impl Dispatcher {
    /// Creates a dispatcher and the publisher that feeds it.
    pub fn new(router: BroadcastRouter) -> (ChangePublisher, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            rx,
            router,
            last_dispatched: HashMap::new(),
        };
        (ChangePublisher { tx }, dispatcher)
    }

    /// Runs until every publisher has been dropped.
    pub async fn run(mut self) {
        while let Some(published) = self.rx.recv().await {
            self.handle(published.change, published.origin).await;
        }
        tracing::info!("dispatcher stopped");
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Dispatches one change unless it is stale.
    ///
    /// Returns `None` for dropped changes.
    async fn handle(
        &mut self,
        change: OrderChange,
        origin: Option<Interest>,
    ) -> Option<DispatchReport> {
        match &change {
            OrderChange::Removed(id) => {
                self.last_dispatched.insert(*id, REMOVED);
            }
            OrderChange::Cleared => {
                for last in self.last_dispatched.values_mut() {
                    *last = REMOVED;
                }
            }
            OrderChange::Created(order)
            | OrderChange::Updated(order)
            | OrderChange::StatusChanged(order) => {
                let revision = order.revision();
                let last = self.last_dispatched.entry(order.id).or_insert(0);
                if revision <= *last {
                    metrics::counter!("fanout_stale_changes_dropped_total").increment(1);
                    tracing::debug!(
                        order_id = %order.id,
                        revision,
                        last = *last,
                        "stale change dropped"
                    );
                    return None;
                }
                *last = revision;
            }
        }

        Some(self.router.dispatch_with_origin(&change, origin).await)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use common::{ConnectionId, CounterId};
    use domain::{ItemStatus, Money, NewItem, NewOrder, Order};
    use order_store::InMemoryOrderStore;

    use super::*;
    use crate::message::OutboundMessage;
    use crate::subscription::SubscriptionRegistry;

    fn order() -> Order {
        Order::create(
            OrderId::new(1),
            NewOrder::new().item(
                NewItem::new("Steak", "grill", Money::zero(), 1).assigned_to(CounterId::new(1)),
            ),
            Utc::now(),
        )
    }

    async fn dispatcher_with_listener() -> (
        Dispatcher,
        ChangePublisher,
        mpsc::Receiver<Arc<OutboundMessage>>,
    ) {
        let subscriptions = SubscriptionRegistry::new();
        let (tx, rx) = mpsc::channel(16);
        subscriptions
            .join(
                ConnectionId::new(),
                Interest::Counter(CounterId::new(1)),
                tx,
                &InMemoryOrderStore::new(),
            )
            .await
            .unwrap();
        let router = BroadcastRouter::new(subscriptions);
        let (publisher, dispatcher) = Dispatcher::new(router);
        (dispatcher, publisher, rx)
    }

    #[tokio::test]
    async fn test_drops_older_revision_after_newer() {
        let (mut dispatcher, _publisher, mut rx) = dispatcher_with_listener().await;
        let created = order();
        let mut newer = created.clone();
        newer.set_item_status(0, ItemStatus::Ready).unwrap();
        let mut older = created.clone();
        older.set_item_status(0, ItemStatus::InProgress).unwrap();
        older.set_item_status(0, ItemStatus::Pending).unwrap();
        let mut newest = older.clone();
        newest.set_item_status(0, ItemStatus::Ready).unwrap();

        assert!(dispatcher.handle(OrderChange::Created(created), None).await.is_some());
        assert!(dispatcher.handle(OrderChange::Updated(older.clone()), None).await.is_some());
        // Revision 2 arrives after revision 3.
        assert!(dispatcher.handle(OrderChange::Updated(newer), None).await.is_none());
        assert!(dispatcher.handle(OrderChange::Updated(newest.clone()), None).await.is_some());

        let mut received = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            received.push(msg);
        }
        assert_eq!(received.len(), 3);
        match received[2].as_ref() {
            OutboundMessage::OrderUpdate { order } => assert_eq!(order.revision(), newest.revision()),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_revision_is_dropped() {
        let (mut dispatcher, _publisher, _rx) = dispatcher_with_listener().await;
        let created = order();
        assert!(dispatcher.handle(OrderChange::Created(created.clone()), None).await.is_some());
        assert!(dispatcher.handle(OrderChange::Created(created), None).await.is_none());
    }

    #[tokio::test]
    async fn test_late_update_after_removal_is_dropped() {
        let (mut dispatcher, _publisher, mut rx) = dispatcher_with_listener().await;
        let created = order();
        let mut updated = created.clone();
        updated.set_item_status(0, ItemStatus::Ready).unwrap();

        assert!(dispatcher.handle(OrderChange::Created(created), None).await.is_some());
        let report = dispatcher
            .handle(OrderChange::Removed(OrderId::new(1)), None)
            .await
            .unwrap();
        assert_eq!(report, DispatchReport::default());

        // Committed before the delete but published after it.
        assert!(dispatcher.handle(OrderChange::Updated(updated), None).await.is_none());

        assert_eq!(rx.try_recv().unwrap().kind(), "new_order");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_late_update_after_clear_is_dropped() {
        let (mut dispatcher, _publisher, _rx) = dispatcher_with_listener().await;
        let created = order();
        let mut updated = created.clone();
        updated.set_item_status(0, ItemStatus::Ready).unwrap();

        dispatcher.handle(OrderChange::Created(created), None).await;
        dispatcher.handle(OrderChange::Cleared, None).await;
        assert!(dispatcher.handle(OrderChange::Updated(updated), None).await.is_none());
    }

    #[tokio::test]
    async fn test_published_changes_reach_subscribers() {
        let (dispatcher, publisher, mut rx) = dispatcher_with_listener().await;
        let handle = dispatcher.spawn();

        assert!(publisher.publish(OrderChange::Created(order())));
        let msg = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.kind(), "new_order");

        drop(publisher);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
