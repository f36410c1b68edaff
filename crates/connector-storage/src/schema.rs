//! Database schema and migrations.
//!
//! The schema version lives in SQLite's `user_version` pragma. Each entry in
//! [`MIGRATIONS`] moves the schema up by one version.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Migration scripts, oldest first.
const MIGRATIONS: &[&str] = &[
    // v1: namespaced key/value settings
    "CREATE TABLE IF NOT EXISTS kv (
        namespace TEXT NOT NULL CHECK (namespace IN ('sync', 'local')),
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (namespace, key)
    );",
];

/// Current schema version.
pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Applies every migration newer than the database.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    info!("Migrating settings schema from v{} to v{}", current, SCHEMA_VERSION);

    for (index, script) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
        let version = index as i32 + 1;
        conn.execute_batch(&format!(
            "BEGIN; {} PRAGMA user_version = {}; COMMIT;",
            script, version
        ))?;
    }

    Ok(())
}
