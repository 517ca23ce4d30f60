//! Key-value persistence contract shared by the registry, the assignment
//! store, and settings.
//!
//! Values are JSON text. Readers are fail-soft: a missing key or a value that
//! no longer decodes is treated as "nothing stored" rather than an error.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::errors::TerritoryResult;

/// A string-keyed, string-valued persistent store.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> TerritoryResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> TerritoryResult<()>;
    fn remove(&self, key: &str) -> TerritoryResult<()>;
}

/// Read and decode `key`, returning `None` when it is missing, unreadable, or
/// malformed.
pub fn load_json<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Option<T> {
    let raw = match kv.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read {key:?} from storage: {e}");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Discarding malformed {key:?} in storage: {e}");
            None
        }
    }
}

/// Encode `value` as JSON and write it under `key`.
pub fn save_json<T: Serialize + ?Sized>(kv: &dyn KvStore, key: &str, value: &T) -> TerritoryResult<()> {
    let raw = serde_json::to_string(value)?;
    kv.set(key, &raw)
}

/// Process-local store, used for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> TerritoryResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> TerritoryResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> TerritoryResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
