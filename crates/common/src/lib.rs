//! Identifier types shared across the kitchen display crates.

pub mod types;

pub use types::{ConnectionId, CounterId, ItemId, OrderId, ParseIdError};
