//! Card producers
//!
//! A producer owns zero or one connection to the registry service and
//! forwards card operations through it while it is up. Disconnection is an
//! expected, recoverable condition: operations degrade to a traced no-op and
//! report failure through their boolean return, never through an error or a
//! panic.

pub mod base;
pub mod handler;
pub mod state;

pub use base::Producer;
pub use handler::{ProducerHandler, TraceHandler};
pub use state::ConnectionState;
