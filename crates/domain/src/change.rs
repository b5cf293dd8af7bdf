//! Change descriptors returned by committed order mutations.

use common::OrderId;

use crate::order::Order;

/// Describes a committed change to the order store.
///
/// Mutations return one of these instead of notifying anyone themselves;
/// routing and delivery happen wherever the descriptor is handed next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderChange {
    /// A new order was created.
    Created(Order),

    /// Items or fields of an existing order changed.
    Updated(Order),

    /// The order status was set explicitly.
    StatusChanged(Order),

    /// The order was deleted.
    Removed(OrderId),

    /// Every order was deleted.
    Cleared,
}

impl OrderChange {
    /// Returns the short name of the change, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderChange::Created(_) => "created",
            OrderChange::Updated(_) => "updated",
            OrderChange::StatusChanged(_) => "status_changed",
            OrderChange::Removed(_) => "removed",
            OrderChange::Cleared => "cleared",
        }
    }

    /// Returns the order state carried by the change, if any.
    pub fn order(&self) -> Option<&Order> {
        match self {
            OrderChange::Created(order)
            | OrderChange::Updated(order)
            | OrderChange::StatusChanged(order) => Some(order),
            OrderChange::Removed(_) | OrderChange::Cleared => None,
        }
    }

    /// Returns the ID of the affected order, if the change concerns one.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            OrderChange::Removed(id) => Some(*id),
            other => other.order().map(|order| order.id),
        }
    }
}
