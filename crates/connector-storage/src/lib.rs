//! BitKip Connector Storage - SQLite persistence for connector settings.
//!
//! Backs the connector's `sync` and `local` key/value namespaces with a single
//! SQLite file in the user's data directory. [`Database`] implements
//! [`connector_core::KeyValueStore`], so it plugs straight into the
//! connector builder.
//!
//! # Example
//!
//! ```no_run
//! use connector_core::Namespace;
//! use connector_storage::Database;
//! use serde_json::json;
//!
//! let db = Database::in_memory().unwrap();
//! db.set_value(Namespace::Sync, "port", &json!(9563)).unwrap();
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::{Database, DB_FILE_NAME};
pub use error::{Result, StorageError};
pub use models::Entry;
pub use pool::ConnectionPool;
pub use repository::KvRepo;
