//! Infrastructure layer: key-value storage backends and the persistence
//! adapter the storefront engines write through.

pub mod kv_store;
pub mod persistence;

pub use kv_store::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, StoreError};
pub use persistence::{PersistenceAdapter, SELECTION_KEY, WHEEL_STATE_PREFIX, WheelState};
