//! Base producer
//!
//! The composition point of the crate: owns the connection state machine,
//! forwards card operations while the service is reachable, and degrades to
//! a traced no-op otherwise. Concrete producers supply a
//! [`ProducerHandler`](super::handler::ProducerHandler) and decide what
//! content to post and when.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::broker::{ConnectionBroker, ConnectionEvent, ProducerBinding, ProducerId};
use crate::card::Card;
use crate::config::ProducerConfig;
use crate::stats::{ProducerStats, StatsSnapshot};

use super::handler::ProducerHandler;
use super::state::{ConnectionState, LinkState};

/// A producer of cards, attached to the registry service through a broker
///
/// Created `Disconnected`; `start()` requests a connection and `stop()`
/// releases it, any number of times over the producer's lifetime. Posting
/// while disconnected is an expected, recoverable condition reported through
/// the boolean return. There is no queue or retry; a post dropped this way
/// is gone.
pub struct Producer<H: ProducerHandler> {
    id: ProducerId,
    config: ProducerConfig,
    broker: Arc<dyn ConnectionBroker>,
    handler: Arc<H>,
    shared: Arc<Shared>,
    notify_tx: mpsc::UnboundedSender<Card>,
    notify_task: JoinHandle<()>,
}

/// State shared with the event-driver and notification tasks
struct Shared {
    id: ProducerId,
    name: String,
    link: Mutex<LinkState>,
    state_tx: watch::Sender<ConnectionState>,
    stats: ProducerStats,
}

impl Shared {
    fn lock_link(&self) -> MutexGuard<'_, LinkState> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` under the link mutex and publish the resulting state before
    /// releasing it, so watchers observe transitions in order
    fn with_link<R>(&self, f: impl FnOnce(&mut LinkState) -> R) -> R {
        let mut link = self.lock_link();
        let out = f(&mut link);
        let next = link.state();
        self.state_tx.send_if_modified(|state| {
            if *state != next {
                *state = next;
                true
            } else {
                false
            }
        });
        out
    }
}

impl<H: ProducerHandler> Producer<H> {
    /// Create a producer
    ///
    /// Spawns the task that delivers dismissal notifications to `handler`;
    /// must be called within a tokio runtime.
    pub fn new(config: ProducerConfig, broker: Arc<dyn ConnectionBroker>, handler: H) -> Self {
        let id = ProducerId::next();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        let shared = Arc::new(Shared {
            id,
            name: config.name.clone(),
            link: Mutex::new(LinkState::new()),
            state_tx,
            stats: ProducerStats::new(),
        });

        let handler = Arc::new(handler);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let notify_task = tokio::spawn(deliver_dismissals(
            Arc::clone(&shared),
            Arc::clone(&handler),
            notify_rx,
        ));

        Self {
            id,
            config,
            broker,
            handler,
            shared,
            notify_tx,
            notify_task,
        }
    }

    /// This producer's identity
    pub fn id(&self) -> ProducerId {
        self.id
    }

    /// The producer's configuration
    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// The handler driving this producer
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Start the producer and request a connection to the registry service
    ///
    /// Not idempotent: calling this while already connecting or connected
    /// issues a redundant connect request. Callers wanting exactly-once
    /// semantics track their own started flag.
    pub fn start(&self) {
        let epoch = self.shared.with_link(|link| link.begin_connect());

        tracing::debug!(
            producer = %self.id,
            name = %self.config.name,
            service = %self.config.service,
            "connecting"
        );

        let binding = ProducerBinding {
            producer_id: self.id,
            notifications: self.notify_tx.clone(),
        };
        let events = self.broker.request_connection(&self.config.service, binding);

        tokio::spawn(drive(Arc::clone(&self.shared), epoch, events));
    }

    /// Stop the producer and release any outstanding or active connection
    ///
    /// Safe to call when `start()` was never called or the connection never
    /// completed; a connected event arriving after the release is discarded.
    pub fn stop(&self) {
        self.shared.with_link(|link| link.shut_down());
        self.broker.release_connection(self.id);

        tracing::debug!(producer = %self.id, name = %self.config.name, "stopped");
    }

    /// Post a card to the registry service
    ///
    /// Returns `false` without side effects when the service is unreachable.
    /// Posting is best-effort: the card is not queued for later delivery, and
    /// re-posting after the next connection is the caller's decision.
    pub async fn post_card(&self, card: &Card) -> bool {
        let Some(handle) = self.shared.with_link(|link| link.handle()) else {
            self.shared.stats.record_dropped_post();
            tracing::debug!(
                producer = %self.id,
                card = %card.id(),
                "registry service not connected, unable to post card"
            );
            return false;
        };

        match handle.add_card(card.clone()).await {
            Ok(()) => {
                self.shared.stats.record_posted();
                true
            }
            Err(e) => {
                self.shared.stats.record_dropped_post();
                tracing::debug!(
                    producer = %self.id,
                    card = %card.id(),
                    error = %e,
                    "card post rejected"
                );
                false
            }
        }
    }

    /// Remove a previously posted card from the registry service
    ///
    /// Mirrors [`post_card`](Self::post_card): `false` when unreachable. A
    /// card the service does not recognize is the service's concern and is
    /// silently ignored there.
    pub async fn remove_card(&self, card: &Card) -> bool {
        let Some(handle) = self.shared.with_link(|link| link.handle()) else {
            self.shared.stats.record_dropped_remove();
            tracing::debug!(
                producer = %self.id,
                card = %card.id(),
                "registry service not connected, unable to remove card"
            );
            return false;
        };

        match handle.remove_card(card.id()).await {
            Ok(()) => {
                self.shared.stats.record_removed();
                true
            }
            Err(e) => {
                self.shared.stats.record_dropped_remove();
                tracing::debug!(
                    producer = %self.id,
                    card = %card.id(),
                    error = %e,
                    "card remove rejected"
                );
                false
            }
        }
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.lock_link().state()
    }

    /// Subscribe to connection state changes
    ///
    /// For implementations that re-post content after a reconnect.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Producer statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl<H: ProducerHandler> Drop for Producer<H> {
    fn drop(&mut self) {
        // Releasing an absent connection is a no-op at the broker.
        self.broker.release_connection(self.id);
        self.notify_task.abort();
    }
}

/// Apply broker events for the connect request fenced by `epoch`
///
/// A single request can see several transitions (the broker re-delivers
/// `Connected` when a withdrawn service comes back). Events from a request
/// that has since been released are discarded here and end the task.
async fn drive(
    shared: Arc<Shared>,
    epoch: u64,
    mut events: mpsc::UnboundedReceiver<ConnectionEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::Connected(handle) => {
                if shared.with_link(|link| link.apply_connected(epoch, handle)) {
                    shared.stats.record_connect();
                    tracing::info!(
                        producer = %shared.id,
                        name = %shared.name,
                        "connected to registry service"
                    );
                } else {
                    tracing::debug!(producer = %shared.id, "stale connected event discarded");
                    return;
                }
            }
            ConnectionEvent::Disconnected => {
                if shared.with_link(|link| link.apply_disconnected(epoch)) {
                    shared.stats.record_disconnect();
                    tracing::info!(
                        producer = %shared.id,
                        name = %shared.name,
                        "registry service disconnected"
                    );
                } else {
                    tracing::debug!(producer = %shared.id, "stale disconnected event discarded");
                    return;
                }
            }
        }
    }
}

/// Deliver dismissal notifications to the handler
///
/// Runs for the producer's whole lifetime, so handlers always execute here
/// rather than on the registry's calling context.
async fn deliver_dismissals<H: ProducerHandler>(
    shared: Arc<Shared>,
    handler: Arc<H>,
    mut dismissals: mpsc::UnboundedReceiver<Card>,
) {
    while let Some(card) = dismissals.recv().await {
        shared.stats.record_dismissal();
        handler.on_card_dismissed(&card);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::card::CardId;
    use crate::config::ServiceId;
    use crate::producer::handler::TraceHandler;
    use crate::registry::{CardRegistry, ServiceHandle};

    use super::*;

    /// Broker fixture that records requests and lets tests deliver events by
    /// hand
    #[derive(Default)]
    struct RecordingBroker {
        inner: Mutex<RecordingInner>,
    }

    #[derive(Default)]
    struct RecordingInner {
        requests: u64,
        releases: u64,
        senders: Vec<mpsc::UnboundedSender<ConnectionEvent>>,
        bindings: Vec<ProducerBinding>,
    }

    impl RecordingBroker {
        fn requests(&self) -> u64 {
            self.inner.lock().unwrap().requests
        }

        fn releases(&self) -> u64 {
            self.inner.lock().unwrap().releases
        }

        fn last_sender(&self) -> mpsc::UnboundedSender<ConnectionEvent> {
            self.inner
                .lock()
                .unwrap()
                .senders
                .last()
                .expect("no connect request recorded")
                .clone()
        }

        fn last_binding(&self) -> ProducerBinding {
            self.inner
                .lock()
                .unwrap()
                .bindings
                .last()
                .expect("no connect request recorded")
                .clone()
        }

        fn send_connected(&self, handle: ServiceHandle) {
            let _ = self.last_sender().send(ConnectionEvent::Connected(handle));
        }

        fn send_disconnected(&self) {
            let _ = self.last_sender().send(ConnectionEvent::Disconnected);
        }
    }

    impl ConnectionBroker for RecordingBroker {
        fn request_connection(
            &self,
            _service: &ServiceId,
            binding: ProducerBinding,
        ) -> mpsc::UnboundedReceiver<ConnectionEvent> {
            let (tx, rx) = mpsc::unbounded_channel();
            let mut inner = self.inner.lock().unwrap();
            inner.requests += 1;
            inner.senders.push(tx);
            inner.bindings.push(binding);
            rx
        }

        fn release_connection(&self, _producer: ProducerId) {
            self.inner.lock().unwrap().releases += 1;
        }
    }

    /// Handler fixture that records which cards were dismissed
    #[derive(Default)]
    struct RecordingHandler {
        dismissed: Mutex<Vec<CardId>>,
    }

    impl ProducerHandler for RecordingHandler {
        fn on_card_dismissed(&self, card: &Card) {
            self.dismissed.lock().unwrap().push(card.id());
        }
    }

    fn test_config() -> ProducerConfig {
        ProducerConfig::new("test").service(ServiceId::new("test.registry"))
    }

    /// Bind the producer's latest request into `registry` and build the
    /// handle the broker would deliver
    async fn connected_handle(
        registry: &Arc<CardRegistry>,
        broker: &RecordingBroker,
    ) -> ServiceHandle {
        let binding = broker.last_binding();
        registry
            .bind_producer(binding.producer_id, binding.notifications.clone())
            .await;
        ServiceHandle::new(registry, binding.producer_id)
    }

    async fn wait_for_state<H: ProducerHandler>(
        producer: &Producer<H>,
        state: ConnectionState,
    ) {
        let mut changes = producer.state_changes();
        timeout(Duration::from_secs(1), changes.wait_for(|s| *s == state))
            .await
            .expect("state not reached within timeout")
            .expect("state channel closed");
    }

    #[tokio::test]
    async fn test_states_follow_lifecycle() {
        let broker = Arc::new(RecordingBroker::default());
        let registry = Arc::new(CardRegistry::new());
        let producer = Producer::new(
            test_config(),
            Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
            TraceHandler,
        );

        assert_eq!(producer.connection_state(), ConnectionState::Disconnected);

        producer.start();
        assert_eq!(producer.connection_state(), ConnectionState::Connecting);

        let handle = connected_handle(&registry, &broker).await;
        broker.send_connected(handle);
        wait_for_state(&producer, ConnectionState::Connected).await;
        assert!(producer.connection_state().is_connected());

        producer.stop();
        assert_eq!(producer.connection_state(), ConnectionState::Disconnected);
        assert_eq!(broker.releases(), 1);
    }

    #[tokio::test]
    async fn test_post_without_start() {
        let broker = Arc::new(RecordingBroker::default());
        let producer = Producer::new(
            test_config(),
            Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
            TraceHandler,
        );

        assert!(!producer.post_card(&Card::new("orphan")).await);
        assert_eq!(broker.requests(), 0);
        assert_eq!(producer.stats().dropped_posts, 1);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_safe() {
        let broker = Arc::new(RecordingBroker::default());
        let producer = Producer::new(
            test_config(),
            Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
            TraceHandler,
        );

        producer.stop();

        assert_eq!(producer.connection_state(), ConnectionState::Disconnected);
        assert_eq!(broker.releases(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_cycle_posts_resume() {
        let broker = Arc::new(RecordingBroker::default());
        let first_registry = Arc::new(CardRegistry::new());
        let second_registry = Arc::new(CardRegistry::new());
        let producer = Producer::new(
            test_config(),
            Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
            TraceHandler,
        );

        producer.start();
        let handle = connected_handle(&first_registry, &broker).await;
        broker.send_connected(handle);
        wait_for_state(&producer, ConnectionState::Connected).await;

        let c1 = Card::new("c1");
        assert!(producer.post_card(&c1).await);
        assert!(first_registry.contains_card(c1.id()).await);

        broker.send_disconnected();
        wait_for_state(&producer, ConnectionState::Disconnected).await;

        let c2 = Card::new("c2");
        assert!(!producer.post_card(&c2).await);
        assert!(!first_registry.contains_card(c2.id()).await);

        producer.start();
        assert_eq!(broker.requests(), 2);
        let handle = connected_handle(&second_registry, &broker).await;
        broker.send_connected(handle);
        wait_for_state(&producer, ConnectionState::Connected).await;

        assert!(producer.post_card(&c2).await);
        assert!(second_registry.contains_card(c2.id()).await);
        assert!(!first_registry.contains_card(c2.id()).await);

        let stats = producer.stats();
        assert_eq!(stats.posted, 2);
        assert_eq!(stats.dropped_posts, 1);
        assert_eq!(stats.connects, 2);
        assert_eq!(stats.disconnects, 1);
    }

    #[tokio::test]
    async fn test_stale_connected_after_stop_discarded() {
        let broker = Arc::new(RecordingBroker::default());
        let registry = Arc::new(CardRegistry::new());
        let producer = Producer::new(
            test_config(),
            Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
            TraceHandler,
        );

        producer.start();
        let sender = broker.last_sender();
        let handle = connected_handle(&registry, &broker).await;

        producer.stop();
        assert_eq!(broker.releases(), 1);

        // The request was already released; its confirmation arrives late.
        let _ = sender.send(ConnectionEvent::Connected(handle));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(producer.connection_state(), ConnectionState::Disconnected);
        assert!(!producer.post_card(&Card::new("late")).await);
        assert_eq!(registry.card_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_mirrors_post() {
        let broker = Arc::new(RecordingBroker::default());
        let registry = Arc::new(CardRegistry::new());
        let producer = Producer::new(
            test_config(),
            Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
            TraceHandler,
        );

        let card = Card::new("mirror");
        assert!(!producer.remove_card(&card).await);
        assert_eq!(producer.stats().dropped_removes, 1);

        producer.start();
        let handle = connected_handle(&registry, &broker).await;
        broker.send_connected(handle);
        wait_for_state(&producer, ConnectionState::Connected).await;

        assert!(producer.post_card(&card).await);
        assert!(producer.remove_card(&card).await);
        assert!(!registry.contains_card(card.id()).await);

        // Removing a card the service never saw is still a successful
        // forward; ignoring it is the service's concern.
        assert!(producer.remove_card(&Card::new("unknown")).await);
    }

    #[tokio::test]
    async fn test_recovery_without_restart() {
        let broker = Arc::new(RecordingBroker::default());
        let registry = Arc::new(CardRegistry::new());
        let producer = Producer::new(
            test_config(),
            Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
            TraceHandler,
        );

        producer.start();
        let handle = connected_handle(&registry, &broker).await;
        broker.send_connected(handle.clone());
        wait_for_state(&producer, ConnectionState::Connected).await;

        broker.send_disconnected();
        wait_for_state(&producer, ConnectionState::Disconnected).await;

        // Same request, service came back: no start() in between.
        broker.send_connected(handle);
        wait_for_state(&producer, ConnectionState::Connected).await;

        assert!(producer.post_card(&Card::new("after recovery")).await);
        assert_eq!(broker.requests(), 1);
    }

    #[tokio::test]
    async fn test_dismissal_reaches_handler() {
        let broker = Arc::new(RecordingBroker::default());
        let registry = Arc::new(CardRegistry::new());
        let producer = Producer::new(
            test_config(),
            Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
            RecordingHandler::default(),
        );

        producer.start();
        let handle = connected_handle(&registry, &broker).await;
        broker.send_connected(handle);
        wait_for_state(&producer, ConnectionState::Connected).await;

        let card = Card::new("dismiss me");
        assert!(producer.post_card(&card).await);
        assert!(registry.dismiss_card(card.id()).await);

        timeout(Duration::from_secs(1), async {
            loop {
                if producer
                    .handler()
                    .dismissed
                    .lock()
                    .unwrap()
                    .contains(&card.id())
                {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("dismissal not delivered");

        assert_eq!(producer.stats().dismissals, 1);
    }
}
