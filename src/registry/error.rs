//! Registry error types
//!
//! Error types for operations reaching the registry through a service handle.

use crate::broker::ProducerId;

/// Error type for registry operations
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// The producer is not bound to the registry
    ProducerNotBound(ProducerId),
    /// The service behind the handle no longer exists
    ServiceUnavailable,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::ProducerNotBound(producer) => {
                write!(f, "Producer not bound: {}", producer)
            }
            RegistryError::ServiceUnavailable => write!(f, "Registry service unavailable"),
        }
    }
}

impl std::error::Error for RegistryError {}
