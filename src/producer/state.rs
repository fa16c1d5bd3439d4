//! Producer connection state
//!
//! Tracks a producer's view of its connection to the registry service from
//! construction through repeated start/stop cycles, and fences out callbacks
//! from connect requests that have since been released.

use crate::registry::ServiceHandle;

/// Observable connection lifecycle state
///
/// `Disconnected → Connecting → Connected → Disconnected → …`. There is no
/// distinct reconnecting state; a fresh `start()` after disconnection
/// re-enters `Connecting` identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none requested
    Disconnected,
    /// Connect request outstanding
    Connecting,
    /// Service handle cached and usable
    Connected,
}

impl ConnectionState {
    /// Whether card operations can currently be forwarded
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Connection link: the state and the handle it carries while up
///
/// The handle lives inside the `Connected` variant, so a cached handle can
/// never be observed alongside a `Disconnected` state.
#[derive(Debug)]
enum Link {
    Disconnected,
    Connecting,
    Connected(ServiceHandle),
}

/// State+handle pair guarded by the producer's mutex, with the epoch that
/// fences stale broker callbacks
///
/// Every `begin_connect`/`shut_down` bumps the epoch; broker events carry the
/// epoch of the request that produced them and are rejected on mismatch.
#[derive(Debug)]
pub(crate) struct LinkState {
    epoch: u64,
    link: Link,
}

impl LinkState {
    pub(crate) fn new() -> Self {
        Self {
            epoch: 0,
            link: Link::Disconnected,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        match self.link {
            Link::Disconnected => ConnectionState::Disconnected,
            Link::Connecting => ConnectionState::Connecting,
            Link::Connected(_) => ConnectionState::Connected,
        }
    }

    /// Snapshot of the cached handle, if any
    pub(crate) fn handle(&self) -> Option<ServiceHandle> {
        match &self.link {
            Link::Connected(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Enter `Connecting` for a fresh connect request
    ///
    /// Returns the epoch that fences this request's callbacks.
    pub(crate) fn begin_connect(&mut self) -> u64 {
        self.epoch += 1;
        self.link = Link::Connecting;
        self.epoch
    }

    /// Enter `Disconnected`, dropping any cached handle and fencing off
    /// callbacks from earlier requests
    pub(crate) fn shut_down(&mut self) {
        self.epoch += 1;
        self.link = Link::Disconnected;
    }

    /// Apply a broker `Connected` event; returns `false` for stale epochs
    pub(crate) fn apply_connected(&mut self, epoch: u64, handle: ServiceHandle) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.link = Link::Connected(handle);
        true
    }

    /// Apply a broker `Disconnected` event; returns `false` for stale epochs
    pub(crate) fn apply_disconnected(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.link = Link::Disconnected;
        true
    }
}
