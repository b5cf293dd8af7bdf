//! Domain error types.

use common::{CounterId, OrderId};
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The counter does not exist.
    #[error("Counter not found: {0}")]
    CounterNotFound(CounterId),

    /// Another counter already uses this PIN.
    #[error("PIN already exists")]
    DuplicatePin,

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The item index is past the end of the order's item list.
    #[error("Item index {index} out of range for order {order_id} with {len} items")]
    ItemIndexOutOfRange {
        order_id: OrderId,
        index: usize,
        len: usize,
    },

    /// A status string did not name a known status.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// A required field was missing or empty.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl DomainError {
    /// Returns true for errors that reference something that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::CounterNotFound(_)
                | DomainError::OrderNotFound(_)
                | DomainError::ItemIndexOutOfRange { .. }
        )
    }
}
