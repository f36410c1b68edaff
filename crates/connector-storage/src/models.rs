//! Database row types.

use connector_core::Namespace;
use serde::{Deserialize, Serialize};

/// One stored setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub namespace: Namespace,
    pub key: String,
    pub value: serde_json::Value,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
}
