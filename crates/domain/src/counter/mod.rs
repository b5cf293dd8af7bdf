//! Kitchen counters and the category routing table.

mod registry;

use common::CounterId;
use serde::{Deserialize, Serialize};

use crate::serde_util::{optional_string_or_number, string_or_number};

pub use registry::CounterRegistry;

/// A preparation station with its own display terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub id: CounterId,
    pub name: String,
    pub pin: String,
    pub description: String,
    /// Categories routed to this counter.
    pub categories: Vec<String>,
}

/// Payload to create a counter.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCounter {
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub pin: String,

    #[serde(default)]
    pub description: String,
}

impl NewCounter {
    /// Creates a counter payload.
    pub fn new(name: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pin: pin.into(),
            description: String::new(),
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update of a counter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CounterPatch {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub pin: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}
