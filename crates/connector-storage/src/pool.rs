//! Shared SQLite connection.
//!
//! One connection behind a mutex. Settings traffic is a handful of tiny reads
//! per browser event, so there is nothing to gain from more.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::schema::run_migrations;

/// How long a writer waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// Thread-safe handle to the settings database.
#[derive(Clone)]
pub struct ConnectionPool {
    conn: Arc<Mutex<Connection>>,
}

impl ConnectionPool {
    /// Opens (creating if needed) the database file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        // The `config` subcommand and a running host may share the file.
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(mode = %mode, "Opened settings database");
        Self::prepare(conn)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_rows(pool: &ConnectionPool) -> i64 {
        pool.with_connection(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_pool_is_migrated() {
        let pool = ConnectionPool::in_memory().unwrap();
        assert_eq!(count_rows(&pool), 0);
    }

    #[test]
    fn test_clones_share_one_database() {
        let pool = ConnectionPool::in_memory().unwrap();
        let other = pool.clone();

        other
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO kv (namespace, key, value, updated_at) VALUES ('sync', 'port', '1', 'now')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert_eq!(count_rows(&pool), 1);
    }

    #[test]
    fn test_file_pool_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnectionPool::new(dir.path().join("connector.db")).unwrap();

        let mode: String = pool
            .with_connection(|conn| {
                Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
}
