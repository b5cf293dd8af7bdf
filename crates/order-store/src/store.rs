use async_trait::async_trait;
use common::OrderId;
use domain::{ItemStatus, NewOrder, Order, OrderPatch, OrderStatus};

use crate::{OrderQuery, Result};

/// Core trait for order store implementations.
///
/// The store is the single source of truth for orders. Every mutation is
/// atomic with respect to its order: mutations of one order are serialized,
/// mutations of different orders may run concurrently, and readers only ever
/// see committed states. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Creates an order with the next id and returns it.
    ///
    /// Item counters must already be resolved in `new_order`.
    async fn create(&self, new_order: NewOrder) -> Result<Order>;

    /// Retrieves an order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Retrieves every order in ascending id order.
    async fn list(&self) -> Result<Vec<Order>>;

    /// Retrieves orders matching a query, in ascending id order.
    async fn query(&self, query: OrderQuery) -> Result<Vec<Order>>;

    /// Sets the order status by moving every item to the matching item status.
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order>;

    /// Sets the status of one item and recomputes the order status.
    async fn update_item_status(
        &self,
        id: OrderId,
        item_index: usize,
        status: ItemStatus,
    ) -> Result<Order>;

    /// Applies a descriptive field update.
    async fn update(&self, id: OrderId, patch: OrderPatch) -> Result<Order>;

    /// Deletes an order and returns its last state.
    async fn delete(&self, id: OrderId) -> Result<Order>;

    /// Deletes every order and returns how many were removed.
    ///
    /// Ids are not reused afterwards.
    async fn clear(&self) -> Result<usize>;
}

/// Extension trait providing convenience methods for order stores.
#[async_trait]
pub trait OrderStoreExt: OrderStore {
    /// Retrieves orders in the given status.
    async fn orders_by_status(&self, status: OrderStatus) -> Result<Vec<Order>> {
        self.query(OrderQuery::with_status(status)).await
    }

    /// Retrieves orders whose items are all ready.
    async fn ready_to_serve(&self) -> Result<Vec<Order>> {
        self.orders_by_status(OrderStatus::ReadyToServe).await
    }

    /// Checks if an order exists.
    async fn exists(&self, id: OrderId) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }
}

// Blanket implementation for all OrderStore implementations
impl<T: OrderStore + ?Sized> OrderStoreExt for T {}
