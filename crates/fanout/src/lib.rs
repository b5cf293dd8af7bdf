//! Change fan-out to kitchen display terminals.
//!
//! This crate delivers committed order changes to connected terminals:
//! - [`SubscriptionRegistry`] tracks live connections and their interest
//! - [`BroadcastRouter`] decides who receives what and delivers it
//! - [`Dispatcher`] consumes published changes in order and drops stale ones
//! - [`OutboundMessage`] / [`InboundMessage`] are the terminal wire protocol

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod router;
pub mod subscription;
pub mod view;

pub use dispatcher::{ChangePublisher, Dispatcher};
pub use error::{FanoutError, Result};
pub use message::{DecodeError, ErrorReply, InboundMessage, OutboundMessage};
pub use router::{BroadcastRouter, Delivery, DispatchReport};
pub use subscription::{Interest, Outbox, SubscriptionRegistry};
