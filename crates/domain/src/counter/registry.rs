//! In-memory counter registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use common::CounterId;
use tokio::sync::RwLock;

use super::{Counter, CounterPatch, NewCounter};
use crate::error::DomainError;

#[derive(Debug)]
struct CounterRecord {
    name: String,
    pin: String,
    description: String,
    categories: Vec<String>,
}

#[derive(Debug)]
struct RegistryState {
    counters: BTreeMap<CounterId, CounterRecord>,
    /// category → owning counter; each category has at most one owner.
    routes: HashMap<String, CounterId>,
    next_id: u32,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            counters: BTreeMap::new(),
            routes: HashMap::new(),
            next_id: 1,
        }
    }
}

impl RegistryState {
    fn pin_taken(&self, pin: &str, except: Option<CounterId>) -> bool {
        self.counters
            .iter()
            .any(|(id, record)| Some(*id) != except && record.pin == pin)
    }

    fn to_counter(id: CounterId, record: &CounterRecord) -> Counter {
        Counter {
            id,
            name: record.name.clone(),
            pin: record.pin.clone(),
            description: record.description.clone(),
            categories: record.categories.clone(),
        }
    }
}

/// Registry of counters and of which counter each item category goes to.
///
/// Cloning shares the same underlying state. Construct one at process start
/// and hand it to whoever needs it.
#[derive(Debug, Clone, Default)]
pub struct CounterRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl CounterRegistry {
    /// Creates an empty registry whose first counter gets ID 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a counter and returns its ID.
    ///
    /// Fails with `DuplicatePin` if another counter already uses the PIN.
    #[tracing::instrument(skip(self, new_counter), fields(name = %new_counter.name))]
    pub async fn create_counter(&self, new_counter: NewCounter) -> Result<CounterId, DomainError> {
        if new_counter.name.trim().is_empty() || new_counter.pin.is_empty() {
            return Err(DomainError::Validation(
                "Name and PIN are required".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if state.pin_taken(&new_counter.pin, None) {
            return Err(DomainError::DuplicatePin);
        }

        let id = CounterId::new(state.next_id);
        state.next_id += 1;
        state.counters.insert(
            id,
            CounterRecord {
                name: new_counter.name,
                pin: new_counter.pin,
                description: new_counter.description,
                categories: Vec::new(),
            },
        );

        tracing::info!(counter_id = %id, "counter created");
        Ok(id)
    }

    /// Updates the given fields of a counter.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_counter(&self, id: CounterId, patch: CounterPatch) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if !state.counters.contains_key(&id) {
            return Err(DomainError::CounterNotFound(id));
        }

        if let Some(pin) = &patch.pin {
            if pin.is_empty() {
                return Err(DomainError::Validation("PIN cannot be empty".to_string()));
            }
            if state.pin_taken(pin, Some(id)) {
                return Err(DomainError::DuplicatePin);
            }
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(DomainError::Validation("Name cannot be empty".to_string()));
        }

        let record = state
            .counters
            .get_mut(&id)
            .ok_or(DomainError::CounterNotFound(id))?;
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(pin) = patch.pin {
            record.pin = pin;
        }
        if let Some(description) = patch.description {
            record.description = description;
        }
        Ok(())
    }

    /// Deletes a counter and its category routes.
    ///
    /// Items already assigned to the counter keep their assignment.
    #[tracing::instrument(skip(self))]
    pub async fn delete_counter(&self, id: CounterId) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state
            .counters
            .remove(&id)
            .ok_or(DomainError::CounterNotFound(id))?;
        state.routes.retain(|_, owner| *owner != id);
        tracing::info!(counter_id = %id, "counter deleted");
        Ok(())
    }

    /// Returns a counter by ID.
    pub async fn get_counter(&self, id: CounterId) -> Result<Counter, DomainError> {
        let state = self.state.read().await;
        state
            .counters
            .get(&id)
            .map(|record| RegistryState::to_counter(id, record))
            .ok_or(DomainError::CounterNotFound(id))
    }

    /// Returns all counters in ID order.
    pub async fn list_counters(&self) -> Vec<Counter> {
        let state = self.state.read().await;
        state
            .counters
            .iter()
            .map(|(id, record)| RegistryState::to_counter(*id, record))
            .collect()
    }

    /// Routes the given categories to a counter, replacing its previous set.
    ///
    /// A category already routed to another counter moves to this one.
    #[tracing::instrument(skip(self, categories))]
    pub async fn assign_categories(
        &self,
        id: CounterId,
        categories: Vec<String>,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if !state.counters.contains_key(&id) {
            return Err(DomainError::CounterNotFound(id));
        }

        let mut unique: Vec<String> = Vec::with_capacity(categories.len());
        for category in categories {
            if !unique.contains(&category) {
                unique.push(category);
            }
        }

        state.routes.retain(|_, owner| *owner != id);
        for category in &unique {
            if let Some(previous) = state.routes.insert(category.clone(), id)
                && previous != id
                && let Some(other) = state.counters.get_mut(&previous)
            {
                other.categories.retain(|c| c != category);
                tracing::debug!(%category, from = %previous, to = %id, "category moved");
            }
        }

        if let Some(record) = state.counters.get_mut(&id) {
            record.categories = unique;
        }
        Ok(())
    }

    /// Returns the categories routed to a counter.
    pub async fn categories_for(&self, id: CounterId) -> Result<Vec<String>, DomainError> {
        let state = self.state.read().await;
        state
            .counters
            .get(&id)
            .map(|record| record.categories.clone())
            .ok_or(DomainError::CounterNotFound(id))
    }

    /// Returns every routed category, sorted and deduplicated.
    pub async fn all_categories(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut categories: Vec<String> = state.routes.keys().cloned().collect();
        categories.sort();
        categories
    }

    /// Returns the counter the category is currently routed to.
    pub async fn resolve_counter_for_category(&self, category: &str) -> Option<CounterId> {
        self.state.read().await.routes.get(category).copied()
    }

    /// Returns the number of counters.
    pub async fn len(&self) -> usize {
        self.state.read().await.counters.len()
    }

    /// Returns true if no counters exist.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.counters.is_empty()
    }

    /// Removes all counters and routes, and restarts IDs at 1.
    ///
    /// Administrative operation only.
    #[tracing::instrument(skip(self))]
    pub async fn reset_all(&self) {
        *self.state.write().await = RegistryState::default();
        tracing::warn!("counter registry reset");
    }
}
