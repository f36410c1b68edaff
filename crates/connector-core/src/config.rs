//! Cached connector configuration.
//!
//! Holds the companion app port and the interception toggle. Both values are
//! read from the [`KeyValueStore`] at startup and refreshed before every use,
//! so a settings change made by another process (popup, CLI) is picked up on
//! the next event without any change subscription.
//!
//! ```text
//! Interceptor / Forwarder → ConfigCache.refresh_*() → Cached Value
//!                                  ↓
//!                           KeyValueStore (sync | local)
//! ```
//!
//! When a key is missing the default is written back to the store, so every
//! reader converges on the same value. Two concurrent hydrations may both
//! write the default; that is harmless because the write is idempotent.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::{KeyValueStore, Namespace};

/// Default companion app port.
pub const DEFAULT_PORT: u16 = 9563;

/// Interception is on unless the user turned it off.
pub const DEFAULT_ENABLED: bool = true;

/// Store key holding the port (sync namespace).
pub const PORT_KEY: &str = "port";

/// Store key holding the enabled flag (local namespace).
pub const ENABLED_KEY: &str = "enabled";

/// Cached view of the connector settings.
#[derive(Clone)]
pub struct ConfigCache {
    port: Arc<AtomicU16>,
    enabled: Arc<AtomicBool>,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("port", &self.port.load(Ordering::Relaxed))
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish()
    }
}

impl ConfigCache {
    /// Creates a cache holding the defaults without touching the store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            port: Arc::new(AtomicU16::new(DEFAULT_PORT)),
            enabled: Arc::new(AtomicBool::new(DEFAULT_ENABLED)),
            store,
        }
    }

    /// Creates a cache and hydrates both values from the store.
    pub async fn hydrate(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let cache = Self::new(store);
        cache.refresh().await?;
        Ok(cache)
    }

    /// Last known port. No I/O.
    #[inline]
    pub fn port(&self) -> u16 {
        self.port.load(Ordering::Relaxed)
    }

    /// Last known enabled flag. No I/O.
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Refreshes both cached values from the store.
    pub async fn refresh(&self) -> Result<()> {
        self.refresh_port().await?;
        self.refresh_enabled().await?;
        Ok(())
    }

    /// Reloads the port, persisting the default if none is stored.
    pub async fn refresh_port(&self) -> Result<u16> {
        let stored = self.store.get(Namespace::Sync, PORT_KEY).await?;

        let port = match stored.as_ref().and_then(parse_port) {
            Some(port) => port,
            None => {
                if let Some(value) = stored.as_ref().filter(|v| !is_empty(v)) {
                    warn!(?value, "Stored port is not a valid port number, restoring default");
                }
                self.store
                    .set(Namespace::Sync, PORT_KEY, json!(DEFAULT_PORT))
                    .await?;
                debug!(port = DEFAULT_PORT, "Persisted default port");
                DEFAULT_PORT
            }
        };

        let old = self.port.swap(port, Ordering::SeqCst);
        if old != port {
            info!("Companion port updated: {} -> {}", old, port);
        }
        Ok(port)
    }

    /// Reloads the enabled flag, persisting the default if none is stored.
    pub async fn refresh_enabled(&self) -> Result<bool> {
        let stored = self.store.get(Namespace::Local, ENABLED_KEY).await?;

        let enabled = match stored.as_ref().and_then(Value::as_bool) {
            Some(enabled) => enabled,
            None => {
                self.store
                    .set(Namespace::Local, ENABLED_KEY, json!(DEFAULT_ENABLED))
                    .await?;
                debug!(enabled = DEFAULT_ENABLED, "Persisted default enabled flag");
                DEFAULT_ENABLED
            }
        };

        let old = self.enabled.swap(enabled, Ordering::SeqCst);
        if old != enabled {
            info!("Interception toggled: {} -> {}", old, enabled);
        }
        Ok(enabled)
    }

    /// Writes a new port to the sync namespace.
    ///
    /// The cached value is left alone; the next [`refresh_port`](Self::refresh_port)
    /// picks it up from the store.
    pub async fn set_port(&self, port: u16) -> Result<()> {
        self.store
            .set(Namespace::Sync, PORT_KEY, json!(port))
            .await?;
        info!(port, "Stored new companion port");
        Ok(())
    }

    /// Writes the enabled flag to the local namespace.
    pub async fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.store
            .set(Namespace::Local, ENABLED_KEY, json!(enabled))
            .await?;
        info!(enabled, "Stored interception toggle");
        Ok(())
    }
}

/// Accepts a JSON number (or numeric string, as older popups stored it) in
/// the valid port range.
pub fn parse_port(value: &Value) -> Option<u16> {
    let raw = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u16::try_from(raw).ok().filter(|port| *port != 0)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
