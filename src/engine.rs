//! The engine handle.
//!
//! `DrawEngine` is the crate's public surface: it owns the store handle,
//! the configuration and the event bus. Cloning is cheap (Arc handles)
//! and every operation takes `&self`, so one engine can be shared across
//! request-handler threads. All handlers are synchronous; closing a draw
//! and triggering settlement are invoked by an external caller, never
//! self-triggered.
//!
//! Operations are implemented next to the component they belong to:
//! wallet surface in `ledger`, purchases in `tickets`, the shared-pool
//! lifecycle in `draws`, private pools in `lobby`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::EngineConfig;
use crate::error::CoreResult;
use crate::events::EventBus;
use crate::store::LotteryStore;

/// Current Unix timestamp in seconds
pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Draw engine: wallet ledger + ticket issuer + draw/lobby lifecycles.
#[derive(Clone)]
pub struct DrawEngine {
    pub(crate) store: LotteryStore,
    pub(crate) config: EngineConfig,
    pub(crate) events: EventBus,
}

impl DrawEngine {
    /// Create or open an engine over the store directory at `path`.
    pub fn open(path: &str, config: EngineConfig) -> CoreResult<Self> {
        let store = LotteryStore::open(path)?;
        Ok(Self {
            store,
            config,
            events: EventBus::new(),
        })
    }

    /// The event bus; subscribe here to relay post-commit notifications.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
