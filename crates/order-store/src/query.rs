use common::CounterId;
use domain::{Order, OrderStatus};

/// Builder for constructing order queries.
///
/// Filters are applied to the full order; when a counter is given, matching
/// orders are then reduced to that counter's items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    /// Filter by derived order status.
    pub status: Option<OrderStatus>,

    /// Keep only orders with items for this counter, and only those items.
    pub counter_id: Option<CounterId>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for orders in a given status.
    pub fn with_status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Creates a query for the orders seen by a counter terminal.
    pub fn for_counter(counter_id: CounterId) -> Self {
        Self {
            counter_id: Some(counter_id),
            ..Default::default()
        }
    }

    /// Filters by status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by counter.
    pub fn counter(mut self, counter_id: CounterId) -> Self {
        self.counter_id = Some(counter_id);
        self
    }

    /// Limits the number of orders returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many orders before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Applies the query to a single order, returning what the caller sees.
    pub fn project(&self, order: &Order) -> Option<Order> {
        if let Some(status) = self.status
            && order.status() != status
        {
            return None;
        }
        match self.counter_id {
            Some(counter_id) => order.view_for_counter(counter_id),
            None => Some(order.clone()),
        }
    }

    /// Applies offset and limit to an already filtered, ordered result.
    pub fn paginate(&self, orders: Vec<Order>) -> Vec<Order> {
        let offset = self.offset.unwrap_or(0);
        let orders = orders.into_iter().skip(offset);
        match self.limit {
            Some(limit) => orders.take(limit).collect(),
            None => orders.collect(),
        }
    }
}
