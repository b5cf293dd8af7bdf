//! Order and line item records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common::{CounterId, ItemId, OrderId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

use super::commands::DEFAULT_ESTIMATED_TIME;
use super::{ItemStatus, Money, NewOrder, OrderPatch, OrderStatus, aggregate_status};

/// A line item of an order.
///
/// The item is only reachable through its [`Order`], which never hands out
/// mutable access; `assigned_counter` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: String,
    pub price: Money,
    pub quantity: u32,
    pub assigned_counter: Option<CounterId>,
    pub status: ItemStatus,
}

impl Item {
    /// Returns price × quantity.
    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }

    /// Returns true if the item is routed to the given counter.
    pub fn is_for(&self, counter_id: CounterId) -> bool {
        self.assigned_counter == Some(counter_id)
    }
}

/// A kitchen order.
///
/// The status is derived from the items and recomputed on every mutation;
/// every mutation also bumps `revision`, which subscribers use to discard
/// stale deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    items: Vec<Item>,
    status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer_name: String,
    pub table_number: String,
    pub notes: String,
    total_amount: Money,
    pub estimated_time: u32,
    #[serde(default)]
    revision: u64,
}

impl Order {
    /// Builds an order from a creation payload.
    ///
    /// Each item's `assigned_counter` is taken as given; counter resolution
    /// happens before the payload reaches the store.
    pub fn create(id: OrderId, new_order: NewOrder, now: DateTime<Utc>) -> Self {
        let items: Vec<Item> = new_order
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let quantity = item.effective_quantity();
                Item {
                    id: item.id.unwrap_or_else(|| ItemId::for_position(id, index)),
                    name: item.name,
                    category: item.category,
                    price: item.price.unwrap_or_default(),
                    quantity,
                    assigned_counter: item.assigned_counter,
                    status: item.status.unwrap_or_default(),
                }
            })
            .collect();

        let mut order = Self {
            id,
            order_number: Self::order_number_for(id),
            items,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
            customer_name: new_order.customer_name,
            table_number: new_order.table_number,
            notes: new_order.notes,
            total_amount: Money::zero(),
            estimated_time: new_order.estimated_time.unwrap_or(DEFAULT_ESTIMATED_TIME),
            revision: 1,
        };
        order.recalculate();
        order
    }

    /// Display label for an order id, e.g. `ORD-0042`.
    pub fn order_number_for(id: OrderId) -> String {
        format!("ORD-{:04}", id.value())
    }

    /// Recomputes the derived status and total from the items without
    /// counting a mutation. Used for orders loaded from outside the store.
    pub fn recalculate(&mut self) {
        self.status = aggregate_status(self.items.iter().map(|item| item.status));
        self.total_amount = self.items.iter().map(Item::total_price).sum();
    }

    fn touch(&mut self) {
        self.recalculate();
        self.updated_at = Utc::now().max(self.updated_at);
        self.revision += 1;
    }
}

// Query methods
impl Order {
    /// Returns the items in arrival order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the derived order status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the sum of price × quantity over all items.
    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    /// Returns the number of committed mutations, starting at 1 on creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the distinct counters the order's items are assigned to.
    pub fn counters(&self) -> BTreeSet<CounterId> {
        self.items
            .iter()
            .filter_map(|item| item.assigned_counter)
            .collect()
    }

    /// Returns a copy of the order holding only the items routed to
    /// `counter_id`, or `None` when no item is.
    ///
    /// Every other field, including the order-level status, is copied as is.
    pub fn view_for_counter(&self, counter_id: CounterId) -> Option<Order> {
        let items: Vec<Item> = self
            .items
            .iter()
            .filter(|item| item.is_for(counter_id))
            .cloned()
            .collect();

        if items.is_empty() {
            return None;
        }

        Some(Order {
            items,
            order_number: self.order_number.clone(),
            customer_name: self.customer_name.clone(),
            table_number: self.table_number.clone(),
            notes: self.notes.clone(),
            ..*self
        })
    }
}

// Mutations. Each one recomputes the derived fields and bumps the revision.
impl Order {
    /// Sets the status of the item at `index`.
    pub fn set_item_status(&mut self, index: usize, status: ItemStatus) -> Result<(), DomainError> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or(DomainError::ItemIndexOutOfRange {
                order_id: self.id,
                index,
                len,
            })?;
        item.status = status;
        self.touch();
        Ok(())
    }

    /// Moves every item to the item status that yields `status`.
    ///
    /// An order without items stays `Pending`.
    pub fn set_status(&mut self, status: OrderStatus) {
        let item_status = status.item_status();
        for item in &mut self.items {
            item.status = item_status;
        }
        self.touch();
    }

    /// Applies a descriptive field update.
    pub fn apply_patch(&mut self, patch: &OrderPatch) {
        if let Some(name) = &patch.customer_name {
            self.customer_name.clone_from(name);
        }
        if let Some(table) = &patch.table_number {
            self.table_number.clone_from(table);
        }
        if let Some(notes) = &patch.notes {
            self.notes.clone_from(notes);
        }
        if let Some(minutes) = patch.estimated_time {
            self.estimated_time = minutes;
        }
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::NewItem;

    fn grill() -> CounterId {
        CounterId::new(1)
    }

    fn bar() -> CounterId {
        CounterId::new(2)
    }

    fn sample_order() -> Order {
        let new_order = NewOrder::new()
            .customer("Ada")
            .table("7")
            .item(NewItem::new("Burger", "grill", Money::from_cents(950), 2).assigned_to(grill()))
            .item(NewItem::new("Lemonade", "drinks", Money::from_cents(300), 1).assigned_to(bar()))
            .item(NewItem::new("Salad", "salad", Money::from_cents(700), 0));
        Order::create(OrderId::new(3), new_order, Utc::now())
    }

    #[test]
    fn test_create_assigns_ids_and_defaults() {
        let order = sample_order();
        assert_eq!(order.order_number, "ORD-0003");
        assert_eq!(order.items()[0].id.as_str(), "3_0");
        assert_eq!(order.items()[2].id.as_str(), "3_2");
        assert_eq!(order.items()[2].quantity, 1);
        assert_eq!(order.estimated_time, DEFAULT_ESTIMATED_TIME);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.revision(), 1);
    }

    #[test]
    fn test_total_amount() {
        let order = sample_order();
        assert_eq!(order.total_amount().cents(), 950 * 2 + 300 + 700);
    }

    #[test]
    fn test_create_derives_status_from_initial_items() {
        let new_order = NewOrder::new()
            .item(NewItem::new("Tea", "drinks", Money::zero(), 1).with_status(ItemStatus::Ready));
        let order = Order::create(OrderId::new(1), new_order, Utc::now());
        assert_eq!(order.status(), OrderStatus::ReadyToServe);
    }

    #[test]
    fn test_counters_are_distinct() {
        let order = sample_order();
        let counters: Vec<_> = order.counters().into_iter().collect();
        assert_eq!(counters, vec![grill(), bar()]);
    }

    #[test]
    fn test_view_for_counter_filters_items() {
        let order = sample_order();
        let view = order.view_for_counter(grill()).unwrap();
        assert_eq!(view.items().len(), 1);
        assert_eq!(view.items()[0].name, "Burger");
        assert_eq!(view.id, order.id);
        assert_eq!(view.status(), order.status());

        assert!(order.view_for_counter(CounterId::new(9)).is_none());
    }

    #[test]
    fn test_item_status_updates_recompute_order_status() {
        let mut order = sample_order();
        order.set_item_status(0, ItemStatus::Ready).unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        order.set_item_status(1, ItemStatus::InProgress).unwrap();
        assert_eq!(order.status(), OrderStatus::InProgress);
        order.set_item_status(1, ItemStatus::Ready).unwrap();
        order.set_item_status(2, ItemStatus::Ready).unwrap();
        assert_eq!(order.status(), OrderStatus::ReadyToServe);
        assert_eq!(order.revision(), 5);
    }

    #[test]
    fn test_item_index_out_of_range() {
        let mut order = sample_order();
        let err = order.set_item_status(3, ItemStatus::Ready).unwrap_err();
        assert_eq!(
            err,
            DomainError::ItemIndexOutOfRange {
                order_id: OrderId::new(3),
                index: 3,
                len: 3
            }
        );
        assert_eq!(order.revision(), 1);
    }

    #[test]
    fn test_set_status_moves_all_items() {
        let mut order = sample_order();
        order.set_status(OrderStatus::ReadyToServe);
        assert!(order.items().iter().all(|i| i.status == ItemStatus::Ready));
        assert_eq!(order.status(), OrderStatus::ReadyToServe);
    }

    #[test]
    fn test_set_status_on_empty_order_stays_pending() {
        let mut order = Order::create(OrderId::new(1), NewOrder::new(), Utc::now());
        order.set_status(OrderStatus::ReadyToServe);
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn test_apply_patch() {
        let mut order = sample_order();
        let patch = OrderPatch {
            notes: Some("allergy: nuts".to_string()),
            estimated_time: Some(25),
            ..Default::default()
        };
        order.apply_patch(&patch);
        assert_eq!(order.notes, "allergy: nuts");
        assert_eq!(order.estimated_time, 25);
        assert_eq!(order.customer_name, "Ada");
        assert_eq!(order.revision(), 2);
    }

    #[test]
    fn test_recalculate_repairs_loaded_order() {
        let mut json = serde_json::to_value(sample_order()).unwrap();
        json["status"] = "ready_to_serve".into();
        json["total_amount"] = 1.0.into();
        let mut order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.status(), OrderStatus::ReadyToServe);

        order.recalculate();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.total_amount().cents(), 950 * 2 + 300 + 700);
        assert_eq!(order.revision(), 1);
    }

    #[test]
    fn test_serialization_shape() {
        let order = sample_order();
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["id"], "3");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["items"][0]["assigned_counter"], 1);
        assert!(json["items"][2]["assigned_counter"].is_null());
        assert_eq!(json["total_amount"], 29.0);
    }
}
