use common::OrderId;
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur when interacting with the order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The order was not found in the store.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The mutation was rejected by the domain model.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Reading or writing a snapshot file failed.
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if the error refers to an order, item or counter that
    /// does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::OrderNotFound(_) => true,
            StoreError::Domain(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Result type for order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
