//! In-process connection broker
//!
//! Routes producers to registry services published in the same process. All
//! requests, releases, and service transitions are drained by a single
//! command loop, so every binding observes one event per transition, in
//! order.
//!
//! A binding outlives the service it targets: a request issued before the
//! service is published stays pending until `publish_service`, and a binding
//! whose service is withdrawn receives `Disconnected` and reverts to pending,
//! receiving `Connected` again if the service comes back. Producers recover
//! from service restarts without re-issuing `start()`.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::{ConnectionBroker, ConnectionEvent, ProducerBinding, ProducerId};
use crate::config::ServiceId;
use crate::registry::{CardRegistry, ServiceHandle};

enum Command {
    Request {
        service: ServiceId,
        binding: ProducerBinding,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    },
    Release(ProducerId),
    Publish(ServiceId, Arc<CardRegistry>),
    Withdraw(ServiceId),
}

/// A producer's binding as held by the router
struct Bound {
    service: ServiceId,
    binding: ProducerBinding,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

#[derive(Default)]
struct Router {
    /// Live services by identifier
    services: HashMap<ServiceId, Arc<CardRegistry>>,

    /// At most one binding per producer; a repeated request replaces the
    /// previous one
    bindings: HashMap<ProducerId, Bound>,
}

/// Broker for producers and services living in one process
pub struct InProcessBroker {
    commands: mpsc::UnboundedSender<Command>,
}

impl InProcessBroker {
    /// Create a broker and spawn its command loop
    ///
    /// Must be called within a tokio runtime.
    pub fn new() -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self { commands }
    }

    /// Bring a registry service online under `id`
    ///
    /// Pending connect requests for `id` complete with `Connected`.
    pub fn publish_service(&self, id: ServiceId, registry: Arc<CardRegistry>) {
        let _ = self.commands.send(Command::Publish(id, registry));
    }

    /// Tear the service down
    ///
    /// Every bound producer receives `Disconnected`; their requests revert to
    /// pending and complete again if the service is re-published.
    pub fn withdraw_service(&self, id: ServiceId) {
        let _ = self.commands.send(Command::Withdraw(id));
    }
}

impl Default for InProcessBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionBroker for InProcessBroker {
    fn request_connection(
        &self,
        service: &ServiceId,
        binding: ProducerBinding,
    ) -> mpsc::UnboundedReceiver<ConnectionEvent> {
        let (events, rx) = mpsc::unbounded_channel();
        let _ = self.commands.send(Command::Request {
            service: service.clone(),
            binding,
            events,
        });
        rx
    }

    fn release_connection(&self, producer: ProducerId) {
        let _ = self.commands.send(Command::Release(producer));
    }
}

async fn run(mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut router = Router::default();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Request {
                service,
                binding,
                events,
            } => {
                let producer = binding.producer_id;

                // A repeated request replaces the previous binding; the old
                // event channel closes and its reader drains out.
                if let Some(old) = router.bindings.remove(&producer) {
                    if let Some(registry) = router.services.get(&old.service) {
                        registry.unbind_producer(producer).await;
                    }
                    tracing::debug!(producer = %producer, "binding replaced");
                }

                let bound = Bound {
                    service: service.clone(),
                    binding,
                    events,
                };

                if let Some(registry) = router.services.get(&service) {
                    connect(registry, &bound).await;
                } else {
                    tracing::debug!(
                        producer = %producer,
                        service = %service,
                        "service not published, request pending"
                    );
                }

                router.bindings.insert(producer, bound);
            }

            Command::Release(producer) => {
                if let Some(old) = router.bindings.remove(&producer) {
                    if let Some(registry) = router.services.get(&old.service) {
                        registry.unbind_producer(producer).await;
                    }
                    tracing::debug!(producer = %producer, "connection released");
                }
            }

            Command::Publish(id, registry) => {
                let waiting = router
                    .bindings
                    .values()
                    .filter(|bound| bound.service == id);
                for bound in waiting {
                    connect(&registry, bound).await;
                }

                tracing::info!(service = %id, "service published");
                router.services.insert(id, registry);
            }

            Command::Withdraw(id) => {
                if let Some(registry) = router.services.remove(&id) {
                    let bound_here = router
                        .bindings
                        .values()
                        .filter(|bound| bound.service == id);
                    for bound in bound_here {
                        registry.unbind_producer(bound.binding.producer_id).await;
                        let _ = bound.events.send(ConnectionEvent::Disconnected);
                    }

                    tracing::info!(service = %id, "service withdrawn");
                }
            }
        }
    }
}

/// Bind the producer into the registry and deliver `Connected`
async fn connect(registry: &Arc<CardRegistry>, bound: &Bound) {
    let producer = bound.binding.producer_id;
    registry
        .bind_producer(producer, bound.binding.notifications.clone())
        .await;

    let handle = ServiceHandle::new(registry, producer);
    let _ = bound.events.send(ConnectionEvent::Connected(handle));

    tracing::debug!(producer = %producer, service = %bound.service, "connected");
}
