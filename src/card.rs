//! Card content units
//!
//! A card is the opaque unit of content a producer contributes to the
//! registry service. Identity is explicit and stable so add and remove
//! requests can be matched after the card has crossed the connection.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

static NEXT_CARD_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardId(u64);

impl CardId {
    /// Allocate a fresh identity
    pub fn next() -> Self {
        Self(NEXT_CARD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identity value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card-{}", self.0)
    }
}

/// An opaque content unit
///
/// Cheap to clone: the payload is reference counted, so a producer keeps its
/// copy for a later `remove_card` while the registry holds the posted one.
/// The payload schema is the caller's concern.
#[derive(Debug, Clone)]
pub struct Card {
    id: CardId,
    payload: Bytes,
}

impl Card {
    /// Create a card with a freshly allocated identity
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            id: CardId::next(),
            payload: payload.into(),
        }
    }

    /// Create a card reusing an existing identity
    ///
    /// Posting the result replaces whatever the registry holds under `id`,
    /// which is how content is updated in place.
    pub fn with_id(id: CardId, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// The card's identity
    pub fn id(&self) -> CardId {
        self.id
    }

    /// The opaque content payload
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct() {
        let a = Card::new("a");
        let b = Card::new("b");

        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_identity_stable_across_clone() {
        let card = Card::new(Bytes::from_static(b"payload"));
        let copy = card.clone();

        assert_eq!(card.id(), copy.id());
        assert_eq!(card.payload(), copy.payload());
    }

    #[test]
    fn test_with_id_reuses_identity() {
        let card = Card::new("v1");
        let updated = Card::with_id(card.id(), "v2");

        assert_eq!(card.id(), updated.id());
        assert_eq!(updated.payload(), &Bytes::from_static(b"v2"));
    }

    #[test]
    fn test_display() {
        let id = CardId::next();

        assert_eq!(format!("{}", id), format!("card-{}", id.value()));
    }
}
