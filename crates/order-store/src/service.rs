//! Order service tying the store to the counter registry.

use common::{CounterId, OrderId};
use domain::{
    CounterRegistry, ItemStatus, NewOrder, Order, OrderChange, OrderPatch, OrderStatus,
};

use crate::store::{OrderStore, OrderStoreExt};
use crate::{OrderQuery, Result, StoreError};

/// The committed state of an order and the change to hand to subscribers.
#[derive(Debug, Clone)]
pub struct MutationResult {
    pub order: Order,
    pub change: OrderChange,
}

/// Service for managing orders.
///
/// Provides the operations exposed to terminals and the REST surface. Every
/// mutation returns an [`OrderChange`]; the service never notifies anyone
/// itself.
#[derive(Clone)]
pub struct OrderService<S: OrderStore> {
    store: S,
    counters: CounterRegistry,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates a new order service.
    pub fn new(store: S, counters: CounterRegistry) -> Self {
        Self { store, counters }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the counter registry.
    pub fn counters(&self) -> &CounterRegistry {
        &self.counters
    }

    /// Creates an order, routing each item to a counter.
    ///
    /// The category mapping at this moment decides the counter. A counter
    /// sent by the client is kept only for categories with no mapping.
    #[tracing::instrument(skip(self, new_order), fields(items = new_order.items.len()))]
    pub async fn create_order(&self, mut new_order: NewOrder) -> Result<MutationResult> {
        for item in &mut new_order.items {
            if let Some(counter_id) = self
                .counters
                .resolve_counter_for_category(&item.category)
                .await
            {
                item.assigned_counter = Some(counter_id);
            }
        }

        let order = self.store.create(new_order).await?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, counters = order.counters().len(), "order created");

        Ok(MutationResult {
            change: OrderChange::Created(order.clone()),
            order,
        })
    }

    /// Sets the status of a whole order.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<MutationResult> {
        let order = self.store.update_status(id, status).await?;
        record_mutation("status_changed");
        Ok(MutationResult {
            change: OrderChange::StatusChanged(order.clone()),
            order,
        })
    }

    /// Sets the status of one item.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_status(
        &self,
        id: OrderId,
        item_index: usize,
        status: ItemStatus,
    ) -> Result<MutationResult> {
        let order = self.store.update_item_status(id, item_index, status).await?;
        record_mutation("item_status");
        tracing::debug!(order_id = %id, order_status = %order.status(), "item status updated");
        Ok(MutationResult {
            change: OrderChange::Updated(order.clone()),
            order,
        })
    }

    /// Updates the descriptive fields of an order.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<MutationResult> {
        let order = self.store.update(id, patch).await?;
        record_mutation("fields");
        Ok(MutationResult {
            change: OrderChange::Updated(order.clone()),
            order,
        })
    }

    /// Deletes an order.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<MutationResult> {
        let order = self.store.delete(id).await?;
        record_mutation("deleted");
        tracing::info!(order_id = %id, "order deleted");
        Ok(MutationResult {
            change: OrderChange::Removed(id),
            order,
        })
    }

    /// Deletes every order and returns how many were removed.
    #[tracing::instrument(skip(self))]
    pub async fn clear_orders(&self) -> Result<(usize, OrderChange)> {
        let removed = self.store.clear().await?;
        record_mutation("cleared");
        tracing::warn!(removed, "all orders cleared");
        Ok((removed, OrderChange::Cleared))
    }

    /// Retrieves an order, failing if it does not exist.
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .get(id)
            .await?
            .ok_or(StoreError::OrderNotFound(id))
    }

    /// Retrieves every order.
    pub async fn list_orders(&self) -> Result<Vec<Order>> {
        self.store.list().await
    }

    /// Retrieves orders matching a query.
    pub async fn query(&self, query: OrderQuery) -> Result<Vec<Order>> {
        self.store.query(query).await
    }

    /// Retrieves the orders a counter terminal sees, reduced to its items.
    pub async fn orders_for_counter(&self, counter_id: CounterId) -> Result<Vec<Order>> {
        self.store.query(OrderQuery::for_counter(counter_id)).await
    }

    /// Retrieves orders in the given status.
    pub async fn orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        self.store.orders_by_status(status).await
    }

    /// Retrieves orders ready to be served.
    pub async fn ready_to_serve(&self) -> Result<Vec<Order>> {
        self.store.ready_to_serve().await
    }
}

fn record_mutation(kind: &'static str) {
    metrics::counter!("order_mutations_total", "kind" => kind).increment(1);
}

#[cfg(test)]
mod tests {
    use domain::{Money, NewCounter, NewItem};

    use super::*;
    use crate::InMemoryOrderStore;

    async fn service_with_grill() -> (OrderService<InMemoryOrderStore>, CounterId) {
        let counters = CounterRegistry::new();
        let grill = counters
            .create_counter(NewCounter::new("Grill", "1111"))
            .await
            .unwrap();
        counters
            .assign_categories(grill, vec!["grill".into()])
            .await
            .unwrap();
        (OrderService::new(InMemoryOrderStore::new(), counters), grill)
    }

    #[tokio::test]
    async fn test_create_resolves_counters_from_categories() {
        let (service, grill) = service_with_grill().await;
        let new_order = NewOrder::new()
            .item(NewItem::new("Steak", "grill", Money::from_cents(2200), 1))
            .item(NewItem::new("Salad", "salad", Money::from_cents(800), 1));

        let result = service.create_order(new_order).await.unwrap();
        assert_eq!(result.order.items()[0].assigned_counter, Some(grill));
        assert_eq!(result.order.items()[1].assigned_counter, None);
        assert_eq!(result.change, OrderChange::Created(result.order.clone()));
    }

    #[tokio::test]
    async fn test_create_keeps_client_counter_for_unmapped_category() {
        let (service, _) = service_with_grill().await;
        let elsewhere = CounterId::new(7);
        let new_order = NewOrder::new()
            .item(NewItem::new("Steak", "grill", Money::zero(), 1).assigned_to(elsewhere))
            .item(NewItem::new("Salad", "salad", Money::zero(), 1).assigned_to(elsewhere));

        let order = service.create_order(new_order).await.unwrap().order;
        assert_eq!(order.items()[0].assigned_counter, Some(CounterId::new(1)));
        assert_eq!(order.items()[1].assigned_counter, Some(elsewhere));
    }

    #[tokio::test]
    async fn test_mutations_return_matching_changes() {
        let (service, _) = service_with_grill().await;
        let id = service
            .create_order(NewOrder::new().item(NewItem::new("Steak", "grill", Money::zero(), 1)))
            .await
            .unwrap()
            .order
            .id;

        let result = service
            .update_item_status(id, 0, ItemStatus::InProgress)
            .await
            .unwrap();
        assert!(matches!(result.change, OrderChange::Updated(_)));

        let result = service
            .update_status(id, OrderStatus::ReadyToServe)
            .await
            .unwrap();
        assert!(matches!(result.change, OrderChange::StatusChanged(_)));
        assert_eq!(result.order.status(), OrderStatus::ReadyToServe);

        let result = service.delete_order(id).await.unwrap();
        assert_eq!(result.change, OrderChange::Removed(id));

        let (removed, change) = service.clear_orders().await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(change, OrderChange::Cleared);
    }

    #[tokio::test]
    async fn test_get_missing_order() {
        let (service, _) = service_with_grill().await;
        let err = service.get_order(OrderId::new(3)).await.unwrap_err();
        assert!(matches!(err, StoreError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_orders_for_counter_excludes_other_items() {
        let (service, grill) = service_with_grill().await;
        service
            .create_order(
                NewOrder::new()
                    .item(NewItem::new("Steak", "grill", Money::zero(), 1))
                    .item(NewItem::new("Salad", "salad", Money::zero(), 1)),
            )
            .await
            .unwrap();
        service
            .create_order(NewOrder::new().item(NewItem::new("Salad", "salad", Money::zero(), 1)))
            .await
            .unwrap();

        let orders = service.orders_for_counter(grill).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].items().len(), 1);
        assert_eq!(orders[0].items()[0].name, "Steak");
    }
}
