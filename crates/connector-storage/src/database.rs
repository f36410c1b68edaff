//! High-level database interface.

use std::path::PathBuf;

use async_trait::async_trait;
use connector_core::{KeyValueStore, Namespace, StoreError};
use directories::ProjectDirs;
use serde_json::Value;
use tracing::info;

use crate::error::{Result, StorageError};
use crate::models::Entry;
use crate::pool::ConnectionPool;
use crate::repository::KvRepo;

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "connector.db";

/// High-level database interface for the connector settings.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "bitkip", "connector")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join(DB_FILE_NAME))
    }

    /// Get a value.
    pub fn get_value(&self, namespace: Namespace, key: &str) -> Result<Option<Value>> {
        let entry = self
            .pool
            .with_connection(|conn| KvRepo::get(conn, namespace, key))?;
        Ok(entry.map(|entry| entry.value))
    }

    /// Set a value.
    pub fn set_value(&self, namespace: Namespace, key: &str, value: &Value) -> Result<()> {
        self.pool
            .with_connection(|conn| KvRepo::set(conn, namespace, key, value))
    }

    /// Every entry in a namespace, ordered by key.
    pub fn entries(&self, namespace: Namespace) -> Result<Vec<Entry>> {
        self.pool
            .with_connection(|conn| KvRepo::get_all(conn, namespace))
    }

    /// Runs a blocking database call off the async executor.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Database) -> Result<T> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(db))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, namespace: Namespace, key: &str) -> std::result::Result<Option<Value>, StoreError> {
        let key = key.to_string();
        let value = self
            .blocking(move |db| db.get_value(namespace, &key))
            .await?;
        Ok(value)
    }

    async fn set(&self, namespace: Namespace, key: &str, value: Value) -> std::result::Result<(), StoreError> {
        let key = key.to_string();
        self.blocking(move |db| db.set_value(namespace, &key, &value))
            .await?;
        Ok(())
    }
}
