//! Persistent key/value store capability.
//!
//! The connector keeps two logical namespaces, mirroring the browser's storage
//! areas: `sync` values follow the user across devices, `local` values stay on
//! this machine. The port lives in `sync`, the enabled flag in `local`.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

/// Logical storage area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Synced across the user's devices.
    Sync,
    /// Local to this device.
    Local,
}

impl Namespace {
    /// Returns the namespace as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Local => "local",
        }
    }

    /// Parses a namespace from its string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sync" => Some(Self::Sync),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Asynchronous persistent key/value store.
///
/// `get` returns `Ok(None)` for a missing key; absence is never an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn set(&self, namespace: Namespace, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Volatile store for tests and `--in-memory` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(Namespace, String), Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with one value.
    pub fn with_entry(namespace: Namespace, key: &str, value: Value) -> Self {
        let store = Self::new();
        store.entries.lock().insert((namespace, key.to_string()), value);
        store
    }

    /// Synchronous peek used by tests to inspect what was persisted.
    pub fn peek(&self, namespace: Namespace, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .get(&(namespace, key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, namespace: Namespace, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.peek(namespace, key))
    }

    async fn set(&self, namespace: Namespace, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries
            .lock()
            .insert((namespace, key.to_string()), value);
        Ok(())
    }
}
