//! Registry of connected terminals.

use std::collections::HashMap;
use std::sync::Arc;

use common::{ConnectionId, CounterId};
use domain::Order;
use order_store::OrderStore;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};

use crate::Result;
use crate::message::OutboundMessage;
use crate::view;

/// What a terminal wants to see. Fixed when it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interest {
    /// Every order, unfiltered.
    All,
    /// Only items routed to this counter.
    Counter(CounterId),
}

impl Interest {
    /// Interest for a `counter_id` connection parameter; absent means all.
    pub fn from_counter(counter_id: Option<CounterId>) -> Self {
        counter_id.map_or(Interest::All, Interest::Counter)
    }
}

impl std::fmt::Display for Interest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interest::All => f.write_str("all"),
            Interest::Counter(id) => write!(f, "counter:{id}"),
        }
    }
}

/// Sending half of a connection's bounded outbound queue.
pub type Outbox = mpsc::Sender<Arc<OutboundMessage>>;

#[derive(Debug, Clone)]
struct Member {
    interest: Interest,
    outbox: Outbox,
}

/// Registry of live connections, grouped by interest.
///
/// Cloning shares the same registry.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    members: Arc<RwLock<HashMap<ConnectionId, Member>>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the orders it should start with.
    ///
    /// The connection is registered before the snapshot is read, so any
    /// change committed after the snapshot reaches its outbox. A change
    /// committed in between may arrive as well as appear in the snapshot.
    #[tracing::instrument(skip(self, outbox, store), fields(connection_id = %connection_id, %interest))]
    pub async fn join<S>(
        &self,
        connection_id: ConnectionId,
        interest: Interest,
        outbox: Outbox,
        store: &S,
    ) -> Result<Vec<Order>>
    where
        S: OrderStore + ?Sized,
    {
        let count = {
            let mut members = self.members.write().await;
            members.insert(connection_id, Member { interest, outbox });
            members.len()
        };
        metrics::gauge!("fanout_connections").set(count as f64);

        match view::snapshot_for(store, interest).await {
            Ok(orders) => {
                tracing::info!(orders = orders.len(), "terminal joined");
                Ok(orders)
            }
            Err(e) => {
                self.leave(connection_id).await;
                Err(e)
            }
        }
    }

    /// Removes a connection. Returns false if it was not registered.
    #[tracing::instrument(skip(self), fields(connection_id = %connection_id))]
    pub async fn leave(&self, connection_id: ConnectionId) -> bool {
        let (removed, count) = {
            let mut members = self.members.write().await;
            let removed = members.remove(&connection_id).is_some();
            (removed, members.len())
        };
        if removed {
            metrics::gauge!("fanout_connections").set(count as f64);
            tracing::info!("terminal left");
        }
        removed
    }

    /// Returns clones of the outboxes of every connection with the given
    /// interest. No lock is held once this returns.
    pub async fn outboxes_for(&self, interest: Interest) -> Vec<(ConnectionId, Outbox)> {
        let members = self.members.read().await;
        members
            .iter()
            .filter(|(_, m)| m.interest == interest)
            .map(|(id, m)| (*id, m.outbox.clone()))
            .collect()
    }

    /// Returns the interest a connection joined with.
    pub async fn interest_of(&self, connection_id: ConnectionId) -> Option<Interest> {
        self.members
            .read()
            .await
            .get(&connection_id)
            .map(|m| m.interest)
    }

    /// Returns the number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.members.read().await.len()
    }
}
