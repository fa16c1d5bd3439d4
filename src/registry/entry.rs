//! Registry card entries
//!
//! Per-card state held by the registry: the card, who posted it, and when.

use std::time::Instant;

use crate::broker::ProducerId;
use crate::card::Card;

/// A card held by the registry
#[derive(Debug, Clone)]
pub struct CardEntry {
    /// Producer that posted the card
    pub owner: ProducerId,

    /// The card itself
    pub card: Card,

    /// When the card was posted (or last replaced)
    pub posted_at: Instant,
}

impl CardEntry {
    pub(super) fn new(owner: ProducerId, card: Card) -> Self {
        Self {
            owner,
            card,
            posted_at: Instant::now(),
        }
    }

    /// How long the card has been on display
    pub fn age(&self) -> std::time::Duration {
        self.posted_at.elapsed()
    }
}

/// Point-in-time registry statistics
#[derive(Debug, Clone)]
pub struct RegistryStats {
    /// Cards currently on display
    pub card_count: usize,

    /// Producers currently bound
    pub producer_count: usize,
}
