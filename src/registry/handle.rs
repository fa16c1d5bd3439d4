//! Connection-scoped service handle
//!
//! The opaque reference a producer holds while connected. The handle keeps
//! only a weak reference to the registry, and the registry only accepts calls
//! from producers it still has bound: once the producer is unbound or the
//! service is dropped, a stale handle is rejected rather than acted on. There
//! is no half-valid window.

use std::sync::{Arc, Weak};

use crate::broker::ProducerId;
use crate::card::{Card, CardId};

use super::error::RegistryError;
use super::store::CardRegistry;

/// Opaque reference to the live registry endpoint
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    registry: Weak<CardRegistry>,
    producer: ProducerId,
}

impl ServiceHandle {
    pub(crate) fn new(registry: &Arc<CardRegistry>, producer: ProducerId) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            producer,
        }
    }

    /// Producer this handle was issued to
    pub fn producer(&self) -> ProducerId {
        self.producer
    }

    fn registry(&self) -> Result<Arc<CardRegistry>, RegistryError> {
        self.registry
            .upgrade()
            .ok_or(RegistryError::ServiceUnavailable)
    }

    /// Forward an add request to the registry
    pub async fn add_card(&self, card: Card) -> Result<(), RegistryError> {
        self.registry()?.add_card(self.producer, card).await
    }

    /// Forward a remove request to the registry
    pub async fn remove_card(&self, id: CardId) -> Result<(), RegistryError> {
        self.registry()?.remove_card(self.producer, id).await
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;

    #[tokio::test]
    async fn test_handle_outliving_service_is_rejected() {
        let registry = Arc::new(CardRegistry::new());
        let producer = ProducerId::next();
        let handle = ServiceHandle::new(&registry, producer);

        drop(registry);

        let result = handle.add_card(Card::new("late")).await;
        assert_err!(&result);
        assert!(matches!(result, Err(RegistryError::ServiceUnavailable)));
    }
}
