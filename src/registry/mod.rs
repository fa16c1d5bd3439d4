//! Card registry service
//!
//! The registry is the single shared endpoint that aggregates cards from any
//! number of producers and routes dismissal notifications back to the card's
//! origin.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<CardRegistry>
//!                  ┌──────────────────────────┐
//!                  │ cards: CardId → Entry    │
//!                  │ producers: Id → notify tx│
//!                  └────────────┬─────────────┘
//!                               │
//!        ┌──────────────────────┼──────────────────────┐
//!        │                      │                      │
//!        ▼                      ▼                      ▼
//!   [Producer]             [Producer]             (host UI)
//!   handle.add_card()      handle.remove_card()   dismiss_card()
//!        ▲                                             │
//!        └───────── on_card_dismissed ◄────────────────┘
//! ```
//!
//! Producers never hold the registry directly; they reach it through the
//! connection-scoped [`ServiceHandle`] issued by the broker, which goes stale
//! the instant the producer is unbound or the service is dropped.

pub mod entry;
pub mod error;
pub mod handle;
pub mod store;

pub use entry::{CardEntry, RegistryStats};
pub use error::RegistryError;
pub use handle::ServiceHandle;
pub use store::CardRegistry;
