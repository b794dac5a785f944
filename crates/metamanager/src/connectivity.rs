//! Cloud connectivity flag.
//!
//! The hub announces link changes with a `NodeConnection` message whose content is
//! `cloud_connected` or `cloud_disconnected`. The flag decides whether point queries are
//! answered from upstream or from the local cache. The node starts disconnected.

use edge_bus::Content;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const CLOUD_CONNECTED: &str = "cloud_connected";
pub const CLOUD_DISCONNECTED: &str = "cloud_disconnected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Connected,
    Disconnected,
}

impl ConnectivityState {
    /// Parses a `NodeConnection` payload. Unknown payloads yield `None`.
    pub fn from_content(content: &Content) -> Option<Self> {
        match content.as_str()? {
            CLOUD_CONNECTED => Some(ConnectivityState::Connected),
            CLOUD_DISCONNECTED => Some(ConnectivityState::Disconnected),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Content {
        match self {
            ConnectivityState::Connected => CLOUD_CONNECTED.into(),
            ConnectivityState::Disconnected => CLOUD_DISCONNECTED.into(),
        }
    }
}

impl Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectivityState::Connected => f.write_str(CLOUD_CONNECTED),
            ConnectivityState::Disconnected => f.write_str(CLOUD_DISCONNECTED),
        }
    }
}

/// Shared connectivity flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Connectivity {
    connected: Arc<AtomicBool>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, state: ConnectivityState) {
        self.connected
            .store(state == ConnectivityState::Connected, Ordering::SeqCst);
    }

    pub fn state(&self) -> ConnectivityState {
        if self.is_connected() {
            ConnectivityState::Connected
        } else {
            ConnectivityState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
