//! Fan-out error types.

use common::ConnectionId;
use thiserror::Error;

/// Errors that can occur while fanning out changes.
#[derive(Debug, Error)]
pub enum FanoutError {
    /// Loading a snapshot from the order store failed.
    #[error("Order store error: {0}")]
    Store(#[from] order_store::StoreError),

    /// The connection's outbox is full.
    #[error("Connection {0} is lagging")]
    Lagging(ConnectionId),

    /// The connection's outbox is closed.
    #[error("Connection {0} is closed")]
    Closed(ConnectionId),
}

/// Result type for fan-out operations.
pub type Result<T> = std::result::Result<T, FanoutError>;
