//! Terminal wire protocol.
//!
//! Every frame is a JSON text message. Server frames carry a `type` tag;
//! replies to bad client frames are a bare `{"error": "..."}` object.

use common::OrderId;
use domain::{Order, OrderStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Messages sent from the server to a terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Every order the terminal should see, sent once after connecting.
    InitialData { orders: Vec<Order> },

    /// An order was created.
    NewOrder { order: Order },

    /// An order's items or fields changed.
    OrderUpdate { order: Order },

    /// An order's status was set explicitly.
    OrderStatusUpdate {
        order_id: OrderId,
        status: OrderStatus,
    },
}

impl OutboundMessage {
    /// Returns the wire tag, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::InitialData { .. } => "initial_data",
            OutboundMessage::NewOrder { .. } => "new_order",
            OutboundMessage::OrderUpdate { .. } => "order_update",
            OutboundMessage::OrderStatusUpdate { .. } => "order_status_update",
        }
    }
}

/// Reply to a client frame that could not be handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Messages sent from a terminal to the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Sets the status of a whole order. The status is kept as text so an
    /// unknown value can be reported back verbatim.
    UpdateOrderStatus { order_id: OrderId, status: String },
}

impl InboundMessage {
    const KNOWN_TYPES: &'static [&'static str] = &["update_order_status"];

    /// Decodes a client text frame.
    ///
    /// A frame without a string `type` is treated like an unknown type.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|_| DecodeError::InvalidJson)?;

        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or_default();

        if !Self::KNOWN_TYPES.contains(&kind) {
            return Err(DecodeError::UnknownType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

/// Why a client frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Invalid message: {0}")]
    Malformed(String),

    /// Unknown types are ignored rather than answered.
    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

impl DecodeError {
    /// Returns the reply to send back, or `None` if the frame is ignored.
    pub fn reply(&self) -> Option<ErrorReply> {
        match self {
            DecodeError::UnknownType(_) => None,
            other => Some(ErrorReply::new(other.to_string())),
        }
    }
}
