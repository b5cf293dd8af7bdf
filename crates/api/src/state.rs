//! Shared application state.

use std::time::Duration;

use domain::CounterRegistry;
use fanout::{ChangePublisher, SubscriptionRegistry};
use order_store::{OrderService, OrderStore};

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub orders: OrderService<S>,
    pub counters: CounterRegistry,
    pub subscriptions: SubscriptionRegistry,
    pub publisher: ChangePublisher,
    /// Outbound queue length for each terminal connection.
    pub subscriber_buffer: usize,
    /// Time a terminal socket may take to accept one frame.
    pub delivery_timeout: Duration,
}
