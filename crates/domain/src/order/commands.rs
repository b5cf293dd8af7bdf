//! Order input payloads.

use common::{CounterId, ItemId};
use serde::Deserialize;

use super::{ItemStatus, Money};
use crate::error::DomainError;
use crate::serde_util::{optional_string_or_number, string_or_number};

/// Default preparation estimate, in minutes.
pub const DEFAULT_ESTIMATED_TIME: u32 = 15;

/// Payload to create a new order with its full item list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrder {
    /// Items in arrival order.
    #[serde(default)]
    pub items: Vec<NewItem>,

    #[serde(default)]
    pub customer_name: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub table_number: String,

    #[serde(default)]
    pub notes: String,

    /// Preparation estimate in minutes.
    #[serde(default)]
    pub estimated_time: Option<u32>,
}

impl NewOrder {
    /// Creates an empty order payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item.
    pub fn item(mut self, item: NewItem) -> Self {
        self.items.push(item);
        self
    }

    /// Sets the customer name.
    pub fn customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = name.into();
        self
    }

    /// Sets the table number.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table_number = table.into();
        self
    }

    /// Checks that every line total and the order total fit in [`Money`].
    pub fn validate(&self) -> Result<(), DomainError> {
        self.items
            .iter()
            .try_fold(Money::zero(), |total, item| {
                item.price
                    .unwrap_or_default()
                    .checked_mul(item.effective_quantity())
                    .and_then(|line| total.checked_add(line))
            })
            .map(|_| ())
            .ok_or_else(|| DomainError::Validation("order total is out of range".to_string()))
    }
}

/// A line item as submitted by the ordering front-end.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewItem {
    /// Client-supplied item ID; derived from the position when absent.
    #[serde(default)]
    pub id: Option<ItemId>,

    #[serde(default)]
    pub name: String,

    /// Category label used to route the item to a counter.
    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub price: Option<Money>,

    /// Missing or zero quantities count as one.
    #[serde(default)]
    pub quantity: Option<u32>,

    /// Counter chosen by the client. Only used when the category has no
    /// counter mapping at creation time.
    #[serde(default)]
    pub assigned_counter: Option<CounterId>,

    #[serde(default)]
    pub status: Option<ItemStatus>,
}

impl NewItem {
    /// Creates a new item payload.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            category: category.into(),
            price: Some(price),
            quantity: Some(quantity),
            assigned_counter: None,
            status: None,
        }
    }

    /// Returns the quantity the item is created with. Missing or zero
    /// quantities count as one.
    pub fn effective_quantity(&self) -> u32 {
        self.quantity.filter(|q| *q > 0).unwrap_or(1)
    }

    /// Sets the client-chosen counter.
    pub fn assigned_to(mut self, counter_id: CounterId) -> Self {
        self.assigned_counter = Some(counter_id);
        self
    }

    /// Sets the initial item status.
    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Partial update of an order's descriptive fields.
///
/// Items, ids and status cannot be changed through a patch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPatch {
    #[serde(default)]
    pub customer_name: Option<String>,

    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub table_number: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub estimated_time: Option<u32>,
}

impl OrderPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none()
            && self.table_number.is_none()
            && self.notes.is_none()
            && self.estimated_time.is_none()
    }
}
