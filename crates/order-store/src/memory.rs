use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use domain::{DomainError, ItemStatus, NewOrder, Order, OrderPatch, OrderStatus};
use tokio::sync::{Mutex, RwLock};

use crate::snapshot::StoreSnapshot;
use crate::store::OrderStore;
use crate::{OrderQuery, Result, StoreError};

type OrderCell = Arc<Mutex<Order>>;

struct Inner {
    /// Each order sits behind its own lock. The outer lock is only taken for
    /// writing to insert or remove entries.
    orders: RwLock<BTreeMap<OrderId, OrderCell>>,
    next_id: AtomicU64,
    /// Bumped on every committed mutation; lets snapshot writers skip
    /// unchanged stores.
    revision: AtomicU64,
}

/// In-memory order store.
///
/// Cloning shares the same orders. Persistence is handled outside the store
/// by writing [`StoreSnapshot`]s.
#[derive(Clone)]
pub struct InMemoryOrderStore {
    inner: Arc<Inner>,
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderStore {
    /// Creates a new empty store whose first order gets id 1.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                orders: RwLock::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a store holding the orders of a snapshot.
    ///
    /// Derived order fields are recomputed, so a hand-edited file cannot
    /// carry a status that disagrees with its items.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let highest = snapshot.orders.iter().map(|o| o.id.value()).max().unwrap_or(0);
        let next_id = snapshot.next_id.max(highest + 1);
        let orders: BTreeMap<OrderId, OrderCell> = snapshot
            .orders
            .into_iter()
            .map(|mut order| {
                order.recalculate();
                (order.id, Arc::new(Mutex::new(order)))
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                orders: RwLock::new(orders),
                next_id: AtomicU64::new(next_id),
                revision: AtomicU64::new(0),
            }),
        }
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.inner.orders.read().await.len()
    }

    /// Returns the id the next created order will get.
    pub fn next_id(&self) -> OrderId {
        OrderId::new(self.inner.next_id.load(Ordering::SeqCst))
    }

    /// Returns the number of mutations committed since the store was built.
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::SeqCst)
    }

    /// Captures every order and the id allocator.
    ///
    /// Each order is copied under its own lock, so the snapshot never holds a
    /// half-applied mutation.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let orders = self.inner.orders.read().await;
        let mut copied = Vec::with_capacity(orders.len());
        for cell in orders.values() {
            copied.push(cell.lock().await.clone());
        }
        StoreSnapshot {
            next_id: self.inner.next_id.load(Ordering::SeqCst),
            taken_at: Utc::now(),
            orders: copied,
        }
    }

    async fn cells(&self) -> Vec<OrderCell> {
        self.inner.orders.read().await.values().cloned().collect()
    }

    fn committed(&self) {
        self.inner.revision.fetch_add(1, Ordering::SeqCst);
    }

    /// Runs `apply` on one order under its lock and returns the new state.
    ///
    /// The map's read guard is held for the whole mutation, so a concurrent
    /// delete waits until the mutation has committed.
    async fn mutate<F>(&self, id: OrderId, apply: F) -> Result<Order>
    where
        F: FnOnce(&mut Order) -> std::result::Result<(), DomainError> + Send,
    {
        let orders = self.inner.orders.read().await;
        let cell = orders.get(&id).ok_or(StoreError::OrderNotFound(id))?;
        let mut order = cell.lock().await;
        apply(&mut order)?;
        self.committed();
        Ok(order.clone())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, new_order: NewOrder) -> Result<Order> {
        new_order.validate()?;
        let mut orders = self.inner.orders.write().await;
        let id = OrderId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let order = Order::create(id, new_order, Utc::now());
        orders.insert(id, Arc::new(Mutex::new(order.clone())));
        self.committed();
        Ok(order)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        let cell = self.inner.orders.read().await.get(&id).cloned();
        match cell {
            Some(cell) => Ok(Some(cell.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for cell in self.cells().await {
            orders.push(cell.lock().await.clone());
        }
        Ok(orders)
    }

    async fn query(&self, query: OrderQuery) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for cell in self.cells().await {
            let order = cell.lock().await;
            if let Some(projected) = query.project(&order) {
                orders.push(projected);
            }
        }
        Ok(query.paginate(orders))
    }

    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        self.mutate(id, |order| {
            order.set_status(status);
            Ok(())
        })
        .await
    }

    async fn update_item_status(
        &self,
        id: OrderId,
        item_index: usize,
        status: ItemStatus,
    ) -> Result<Order> {
        self.mutate(id, |order| order.set_item_status(item_index, status))
            .await
    }

    async fn update(&self, id: OrderId, patch: OrderPatch) -> Result<Order> {
        self.mutate(id, |order| {
            order.apply_patch(&patch);
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: OrderId) -> Result<Order> {
        let cell = self
            .inner
            .orders
            .write()
            .await
            .remove(&id)
            .ok_or(StoreError::OrderNotFound(id))?;
        self.committed();
        let order = cell.lock().await.clone();
        Ok(order)
    }

    async fn clear(&self) -> Result<usize> {
        let mut orders = self.inner.orders.write().await;
        let removed = orders.len();
        orders.clear();
        self.committed();
        Ok(removed)
    }
}
