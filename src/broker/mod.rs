//! Connection broker contract
//!
//! The broker is the facility, supplied by the hosting environment, that
//! resolves a logical service identifier to a live registry endpoint. A
//! producer requests a connection in `start()` and releases it in `stop()`;
//! the broker answers with tagged [`ConnectionEvent`]s delivered
//! asynchronously over a channel, one event per logical transition, in order.
//!
//! The delivery task is the broker's, not the producer's: implementations
//! must not assume which context the producer reads events from.

pub mod local;

pub use local::InProcessBroker;

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;

use crate::card::Card;
use crate::config::ServiceId;
use crate::registry::ServiceHandle;

static NEXT_PRODUCER_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a producer
///
/// Attached to connect requests so broker events and dismissal notifications
/// reach the right instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProducerId(u64);

impl ProducerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_PRODUCER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identity value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProducerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "producer-{}", self.0)
    }
}

/// Connection transition delivered by the broker
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The service became reachable; the handle is valid until the next
    /// `Disconnected`
    Connected(ServiceHandle),
    /// The service went away; any cached handle must be dropped immediately
    Disconnected,
}

/// Caller identity attached to a connect request
///
/// Carries the route the service uses to deliver dismissal notifications
/// back to the requesting producer.
#[derive(Debug, Clone)]
pub struct ProducerBinding {
    /// The requesting producer
    pub producer_id: ProducerId,

    /// Channel on which dismissed cards are delivered to the producer
    pub notifications: mpsc::UnboundedSender<Card>,
}

/// Asynchronous connect primitive supplied by the hosting environment
pub trait ConnectionBroker: Send + Sync + 'static {
    /// Request a connection to `service` on behalf of the producer identified
    /// by `binding`
    ///
    /// Events arrive on the returned channel: `Connected(handle)` when the
    /// service is reachable, `Disconnected` when it goes away. A request for
    /// a service that does not exist yet is not an error; the channel simply
    /// stays quiet until the service comes up.
    fn request_connection(
        &self,
        service: &ServiceId,
        binding: ProducerBinding,
    ) -> mpsc::UnboundedReceiver<ConnectionEvent>;

    /// Release the producer's outstanding or active connection
    ///
    /// Releasing a connection that was never requested is a no-op, not an
    /// error.
    fn release_connection(&self, producer: ProducerId);
}
