//! Domain layer for the kitchen display system.
//!
//! This crate provides the core domain types:
//! - Orders, line items and the status aggregation rule
//! - Counters and the category routing registry
//! - Change descriptors emitted by committed order mutations

pub mod change;
pub mod counter;
pub mod error;
pub mod order;
mod serde_util;

pub use change::OrderChange;
pub use counter::{Counter, CounterPatch, CounterRegistry, NewCounter};
pub use error::DomainError;
pub use order::{
    DEFAULT_ESTIMATED_TIME, Item, ItemStatus, Money, NewItem, NewOrder, Order, OrderPatch,
    OrderStatus, aggregate_status,
};
