//! Item and order status, and the aggregation rule between them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Preparation status of a single line item.
///
/// Any status may follow any other; a kitchen terminal can move a `Ready`
/// item back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not started.
    #[default]
    Pending,

    /// Being prepared at its counter.
    InProgress,

    /// Prepared and waiting to be served.
    Ready,
}

impl ItemStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::Ready => "ready",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "in_progress" => Ok(ItemStatus::InProgress),
            "ready" => Ok(ItemStatus::Ready),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

/// Order-level status, always derived from the item statuses.
///
/// ```text
/// all items Ready (non-empty)      ──► ReadyToServe
/// otherwise, any item InProgress   ──► InProgress
/// otherwise                        ──► Pending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    InProgress,
    ReadyToServe,
}

impl OrderStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::ReadyToServe => "ready_to_serve",
        }
    }

    /// The item status that, applied to every item, yields this order status.
    pub fn item_status(&self) -> ItemStatus {
        match self {
            OrderStatus::Pending => ItemStatus::Pending,
            OrderStatus::InProgress => ItemStatus::InProgress,
            OrderStatus::ReadyToServe => ItemStatus::Ready,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "in_progress" => Ok(OrderStatus::InProgress),
            "ready_to_serve" => Ok(OrderStatus::ReadyToServe),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

/// Computes the order status from the statuses of its items.
///
/// An empty item list is `Pending`, never `ReadyToServe`.
pub fn aggregate_status<I>(statuses: I) -> OrderStatus
where
    I: IntoIterator<Item = ItemStatus>,
{
    let mut any = false;
    let mut all_ready = true;
    let mut any_in_progress = false;

    for status in statuses {
        any = true;
        match status {
            ItemStatus::Ready => {}
            ItemStatus::InProgress => {
                all_ready = false;
                any_in_progress = true;
            }
            ItemStatus::Pending => all_ready = false,
        }
    }

    if any && all_ready {
        OrderStatus::ReadyToServe
    } else if any_in_progress {
        OrderStatus::InProgress
    } else {
        OrderStatus::Pending
    }
}
