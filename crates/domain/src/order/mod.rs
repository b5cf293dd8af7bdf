//! Orders, line items, and the status aggregation rule.

mod commands;
mod model;
mod status;
mod value_objects;

pub use commands::{DEFAULT_ESTIMATED_TIME, NewItem, NewOrder, OrderPatch};
pub use model::{Item, Order};
pub use status::{ItemStatus, OrderStatus, aggregate_status};
pub use value_objects::Money;
