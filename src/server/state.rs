use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::relay::Relay;

/// Shared application state accessible to all HTTP handlers.
///
/// The relay is published once the background startup succeeds; until then
/// the service reports itself as initializing.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    relay: Arc<OnceCell<Arc<Relay>>>,
}

impl AppState {
    pub fn new(config: Arc<RelayConfig>) -> Self {
        Self {
            config,
            relay: Arc::new(OnceCell::new()),
        }
    }

    /// State that is ready from the start.
    pub fn with_relay(config: Arc<RelayConfig>, relay: Arc<Relay>) -> Self {
        Self {
            config,
            relay: Arc::new(OnceCell::new_with(Some(relay))),
        }
    }

    /// Publish the relay; `false` if one was already published.
    pub fn set_relay(&self, relay: Arc<Relay>) -> bool {
        self.relay.set(relay).is_ok()
    }

    pub fn relay(&self) -> Option<Arc<Relay>> {
        self.relay.get().cloned()
    }

    /// The relay, or `NotReady` while startup is still running.
    pub fn ready(&self) -> Result<Arc<Relay>> {
        self.relay().ok_or(RelayError::NotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.relay.initialized()
    }
}
