//! Producer event handler
//!
//! The override point for concrete producers. The base contract only traces
//! dismissals; implementations react by updating whatever tracking they keep
//! for their own cards.

use crate::card::Card;

/// Callbacks delivered to a producer implementation
///
/// `on_card_dismissed` runs on the producer's notification task, which is a
/// different execution context than the one that posted the card; do not
/// assume otherwise.
pub trait ProducerHandler: Send + Sync + 'static {
    /// A previously posted card was dismissed by the user or evicted by the
    /// service
    fn on_card_dismissed(&self, card: &Card) {
        tracing::debug!(card = %card.id(), "card dismissed");
    }
}

/// Handler that keeps the base tracing behavior
///
/// For producers that post fire-and-forget content and don't track
/// dismissals.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceHandler;

impl ProducerHandler for TraceHandler {}
