//! HTTP and WebSocket route handlers.

pub mod counters;
pub mod orders;
pub mod system;
pub mod ws;

use common::{CounterId, OrderId};

use crate::error::ApiError;

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid order id: {id}")))
}

pub(crate) fn parse_counter_id(id: &str) -> Result<CounterId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid counter id: {id}")))
}
