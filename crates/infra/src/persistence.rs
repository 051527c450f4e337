//! Best-effort persistence of comparison selections and wheel state.
//!
//! Everything here fails open: unreadable or malformed stored data reads as
//! "nothing stored", and write failures are logged and swallowed. The caller's
//! in-memory state stays authoritative for the session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use storefront_core::{ProductId, UserId};

use crate::kv_store::KeyValueStore;

/// Selection key for anonymous shoppers. Signed-in shoppers get
/// `comparisonProducts_<userId>`.
pub const SELECTION_KEY: &str = "comparisonProducts";

/// Prefix of the per-user wheel state key (`wheel_state_<userId>`).
pub const WHEEL_STATE_PREFIX: &str = "wheel_state_";

/// Persisted anti-replay flag for the reward wheel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelState {
    pub has_spun: bool,
}

impl WheelState {
    pub fn spun() -> Self {
        Self { has_spun: true }
    }
}

/// Reads and writes storefront state through a [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistenceAdapter {
    store: Arc<dyn KeyValueStore>,
    scope: Option<UserId>,
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, scope: None }
    }

    /// Scope the comparison selection to `user` so shoppers sharing a device
    /// never see each other's selection.
    pub fn scoped_to(mut self, user: Option<UserId>) -> Self {
        self.scope = user;
        self
    }

    pub fn scope(&self) -> Option<UserId> {
        self.scope
    }

    pub fn selection_key(&self) -> String {
        match self.scope {
            Some(user) => format!("{SELECTION_KEY}_{user}"),
            None => SELECTION_KEY.to_string(),
        }
    }

    pub fn wheel_state_key(user: UserId) -> String {
        format!("{WHEEL_STATE_PREFIX}{user}")
    }

    pub fn save_selection(&self, ids: &[ProductId]) {
        let key = self.selection_key();
        match serde_json::to_string(ids) {
            Ok(json) => self.write(&key, json),
            Err(e) => warn!(key = %key, error = %e, "failed to encode comparison selection"),
        }
    }

    /// Stored selection, or an empty one when nothing usable is stored.
    pub fn load_selection(&self) -> Vec<ProductId> {
        let key = self.selection_key();
        let Some(raw) = self.read(&key) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<ProductId>>(&raw) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring malformed comparison selection");
                Vec::new()
            }
        }
    }

    pub fn save_wheel_state(&self, user: UserId, state: WheelState) {
        let key = Self::wheel_state_key(user);
        match serde_json::to_string(&state) {
            Ok(json) => self.write(&key, json),
            Err(e) => warn!(key = %key, error = %e, "failed to encode wheel state"),
        }
    }

    /// Stored wheel state, defaulting to "not spun yet".
    pub fn load_wheel_state(&self, user: UserId) -> WheelState {
        let key = Self::wheel_state_key(user);
        let Some(raw) = self.read(&key) else {
            return WheelState::default();
        };
        match serde_json::from_str::<WheelState>(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring malformed wheel state");
                WheelState::default()
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "store read failed");
                None
            }
        }
    }

    fn write(&self, key: &str, value: String) {
        match self.store.set(key, value) {
            Ok(()) => debug!(key = %key, "persisted"),
            Err(e) => warn!(key = %key, error = %e, "store write failed; keeping in-memory state"),
        }
    }
}

impl core::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}
