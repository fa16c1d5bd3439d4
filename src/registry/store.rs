//! Card registry implementation
//!
//! The central service that aggregates cards from all bound producers and
//! dispatches dismissal notifications back to each card's origin.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};

use crate::broker::ProducerId;
use crate::card::{Card, CardId};

use super::entry::{CardEntry, RegistryStats};
use super::error::RegistryError;

/// Central registry for all posted cards
///
/// Thread-safe via `RwLock`; many producers add and remove concurrently and
/// the registry serializes them.
pub struct CardRegistry {
    /// Cards on display, keyed by identity
    cards: RwLock<HashMap<CardId, CardEntry>>,

    /// Bound producers and their notification routes
    producers: RwLock<HashMap<ProducerId, mpsc::UnboundedSender<Card>>>,
}

impl CardRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            cards: RwLock::new(HashMap::new()),
            producers: RwLock::new(HashMap::new()),
        }
    }

    /// Bind a producer so its cards are accepted and dismissals reach it
    pub async fn bind_producer(
        &self,
        producer: ProducerId,
        notifications: mpsc::UnboundedSender<Card>,
    ) {
        let mut producers = self.producers.write().await;

        if producers.insert(producer, notifications).is_some() {
            tracing::debug!(producer = %producer, "producer re-bound");
        } else {
            tracing::info!(producer = %producer, "producer bound");
        }
    }

    /// Unbind a producer
    ///
    /// Its cards stay on display; only the notification route is dropped.
    pub async fn unbind_producer(&self, producer: ProducerId) {
        let mut producers = self.producers.write().await;

        if producers.remove(&producer).is_none() {
            tracing::warn!(producer = %producer, "unbind for unknown producer");
            return;
        }

        tracing::info!(producer = %producer, "producer unbound");
    }

    /// Accept a card from a bound producer
    ///
    /// Posting a card whose identity is already on display replaces the held
    /// entry.
    pub async fn add_card(&self, producer: ProducerId, card: Card) -> Result<(), RegistryError> {
        if !self.producers.read().await.contains_key(&producer) {
            return Err(RegistryError::ProducerNotBound(producer));
        }

        let mut cards = self.cards.write().await;
        let id = card.id();
        cards.insert(id, CardEntry::new(producer, card));

        tracing::debug!(
            producer = %producer,
            card = %id,
            total = cards.len(),
            "card added"
        );

        Ok(())
    }

    /// Remove a card posted by `producer`
    ///
    /// A card identity the registry does not recognize is benign and ignored;
    /// producers do not validate existence before forwarding.
    pub async fn remove_card(
        &self,
        producer: ProducerId,
        id: CardId,
    ) -> Result<(), RegistryError> {
        if !self.producers.read().await.contains_key(&producer) {
            return Err(RegistryError::ProducerNotBound(producer));
        }

        let mut cards = self.cards.write().await;

        match cards.get(&id) {
            None => {
                tracing::debug!(producer = %producer, card = %id, "remove for unknown card ignored");
                return Ok(());
            }
            Some(entry) if entry.owner != producer => {
                tracing::warn!(
                    card = %id,
                    expected = %entry.owner,
                    actual = %producer,
                    "card remove owner mismatch"
                );
                return Ok(());
            }
            Some(_) => {}
        }

        cards.remove(&id);
        tracing::debug!(
            producer = %producer,
            card = %id,
            total = cards.len(),
            "card removed"
        );

        Ok(())
    }

    /// Dismiss a card on behalf of the user or the host
    ///
    /// The entry is dropped and the owning producer, if still bound, is
    /// notified. Returns whether a card was actually dismissed.
    pub async fn dismiss_card(&self, id: CardId) -> bool {
        let entry = self.cards.write().await.remove(&id);

        let Some(entry) = entry else {
            tracing::debug!(card = %id, "dismiss for unknown card ignored");
            return false;
        };

        let owner = entry.owner;
        let producers = self.producers.read().await;
        let delivered = match producers.get(&owner) {
            Some(notifications) => notifications.send(entry.card).is_ok(),
            None => false,
        };

        if delivered {
            tracing::debug!(card = %id, producer = %owner, "card dismissed");
        } else {
            tracing::debug!(card = %id, producer = %owner, "card dismissed, owner gone");
        }

        true
    }

    /// Whether the card identified by `id` is on display
    pub async fn contains_card(&self, id: CardId) -> bool {
        self.cards.read().await.contains_key(&id)
    }

    /// Number of cards on display
    pub async fn card_count(&self) -> usize {
        self.cards.read().await.len()
    }

    /// Number of bound producers
    pub async fn producer_count(&self) -> usize {
        self.producers.read().await.len()
    }

    /// Point-in-time statistics
    pub async fn stats(&self) -> RegistryStats {
        RegistryStats {
            card_count: self.card_count().await,
            producer_count: self.producer_count().await,
        }
    }
}

impl Default for CardRegistry {
    fn default() -> Self {
        Self::new()
    }
}
