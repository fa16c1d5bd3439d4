//! Card aggregation over an asynchronous, possibly-absent connection
//!
//! `cardstream` attaches independent card producers to a shared registry
//! service through a connection broker. Producers are created and destroyed
//! independently of the service: the service may not exist yet or may be torn
//! down mid-session, and producers never crash or block when it is
//! unreachable. Card operations degrade to a traced no-op and recover when
//! connectivity is (re)established.
//!
//! # Architecture
//!
//! ```text
//!   Producer ──start()──► ConnectionBroker ──resolves──► CardRegistry
//!      │                        │
//!      │◄─ Connected(handle) ───┘        (one event per transition,
//!      │◄─ Disconnected ────────┘         delivered asynchronously)
//!      │
//!      ├─ post_card ─────────(handle)──────────────────► add_card
//!      ├─ remove_card ───────(handle)──────────────────► remove_card
//!      └◄─ on_card_dismissed ◄───────────────────────── dismiss_card
//! ```
//!
//! The broker is consumed through the [`ConnectionBroker`] trait so hosts can
//! supply their own resolution mechanism; [`InProcessBroker`] routes to
//! registries published in the same process and keeps requests pending until
//! the service comes up.
//!
//! Posting is best-effort: a card posted while disconnected is dropped and
//! reported through the `false` return, not queued or retried.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cardstream::{
//!     Card, CardRegistry, ConnectionBroker, InProcessBroker, Producer, ProducerConfig,
//!     ServiceId, TraceHandler,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let broker = Arc::new(InProcessBroker::new());
//!     let registry = Arc::new(CardRegistry::new());
//!     broker.publish_service(ServiceId::default(), Arc::clone(&registry));
//!
//!     let producer = Producer::new(
//!         ProducerConfig::new("demo"),
//!         Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
//!         TraceHandler,
//!     );
//!     producer.start();
//!
//!     let mut state = producer.state_changes();
//!     state.wait_for(|s| s.is_connected()).await.unwrap();
//!
//!     let card = Card::new("hello");
//!     assert!(producer.post_card(&card).await);
//!
//!     producer.stop();
//! }
//! ```

pub mod broker;
pub mod card;
pub mod config;
pub mod producer;
pub mod registry;
pub mod stats;

pub use broker::{
    ConnectionBroker, ConnectionEvent, InProcessBroker, ProducerBinding, ProducerId,
};
pub use card::{Card, CardId};
pub use config::{ProducerConfig, ServiceId, DEFAULT_SERVICE_ID};
pub use producer::{ConnectionState, Producer, ProducerHandler, TraceHandler};
pub use registry::{CardEntry, CardRegistry, RegistryError, RegistryStats, ServiceHandle};
pub use stats::StatsSnapshot;
