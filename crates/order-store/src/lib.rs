pub mod error;
pub mod memory;
pub mod query;
pub mod service;
pub mod snapshot;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use query::OrderQuery;
pub use service::{MutationResult, OrderService};
pub use snapshot::{SnapshotWriter, StoreSnapshot};
pub use store::{OrderStore, OrderStoreExt};
