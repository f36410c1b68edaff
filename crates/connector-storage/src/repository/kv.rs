//! Key/value repository.

use chrono::Utc;
use connector_core::Namespace;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;
use crate::models::Entry;

/// Repository for namespaced key/value operations.
pub struct KvRepo;

impl KvRepo {
    /// Get a value.
    pub fn get(conn: &Connection, namespace: Namespace, key: &str) -> Result<Option<Entry>> {
        let mut stmt = conn.prepare(
            "SELECT namespace, key, value, updated_at FROM kv
             WHERE namespace = ?1 AND key = ?2",
        )?;

        let entry = stmt
            .query_row(params![namespace.as_str(), key], Self::map_row)
            .optional()?;

        Ok(entry)
    }

    /// Set a value (insert or update).
    pub fn set(
        conn: &Connection,
        namespace: Namespace,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        let value_json = serde_json::to_string(value)?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO kv (namespace, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(namespace, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![namespace.as_str(), key, value_json, now],
        )?;

        Ok(())
    }

    /// Get every value in a namespace.
    pub fn get_all(conn: &Connection, namespace: Namespace) -> Result<Vec<Entry>> {
        let mut stmt = conn.prepare(
            "SELECT namespace, key, value, updated_at FROM kv
             WHERE namespace = ?1 ORDER BY key",
        )?;

        let entries = stmt
            .query_map([namespace.as_str()], Self::map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Maps a row, failing on a namespace or value this build cannot read.
    fn map_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
        let namespace_str: String = row.get(0)?;
        let namespace = Namespace::from_str(&namespace_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                Type::Text,
                format!("unknown namespace {:?}", namespace_str).into(),
            )
        })?;

        let value_str: String = row.get(2)?;
        let value = serde_json::from_str(&value_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;

        Ok(Entry {
            namespace,
            key: row.get(1)?,
            value,
            updated_at: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::schema::run_migrations;
    use serde_json::json;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_set_and_get() {
        let conn = setup_db();

        KvRepo::set(&conn, Namespace::Sync, "port", &json!(9563)).unwrap();
        let entry = KvRepo::get(&conn, Namespace::Sync, "port").unwrap().unwrap();

        assert_eq!(entry.namespace, Namespace::Sync);
        assert_eq!(entry.key, "port");
        assert_eq!(entry.value, json!(9563));
        assert!(!entry.updated_at.is_empty());
    }

    #[test]
    fn test_update_existing() {
        let conn = setup_db();

        KvRepo::set(&conn, Namespace::Local, "enabled", &json!(true)).unwrap();
        KvRepo::set(&conn, Namespace::Local, "enabled", &json!(false)).unwrap();

        let entry = KvRepo::get(&conn, Namespace::Local, "enabled").unwrap().unwrap();
        assert_eq!(entry.value, json!(false));
        assert_eq!(KvRepo::get_all(&conn, Namespace::Local).unwrap().len(), 1);
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let conn = setup_db();

        KvRepo::set(&conn, Namespace::Sync, "port", &json!(4000)).unwrap();
        assert!(KvRepo::get(&conn, Namespace::Local, "port").unwrap().is_none());

        KvRepo::set(&conn, Namespace::Local, "port", &json!(5000)).unwrap();
        let sync = KvRepo::get(&conn, Namespace::Sync, "port").unwrap().unwrap();
        assert_eq!(sync.value, json!(4000));
    }

    #[test]
    fn test_get_nonexistent() {
        let conn = setup_db();
        assert!(KvRepo::get(&conn, Namespace::Sync, "missing").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_value_is_an_error() {
        let conn = setup_db();

        KvRepo::set(&conn, Namespace::Sync, "a", &json!(1)).unwrap();
        conn.execute(
            "INSERT INTO kv (namespace, key, value, updated_at)
             VALUES ('sync', 'port', '{not json', '2026-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let err = KvRepo::get(&conn, Namespace::Sync, "port").unwrap_err();
        assert!(matches!(
            err,
            StorageError::Database(rusqlite::Error::FromSqlConversionFailure(2, Type::Text, _))
        ));
        assert!(KvRepo::get_all(&conn, Namespace::Sync).is_err());
        assert!(KvRepo::get(&conn, Namespace::Sync, "a").unwrap().is_some());
    }

    #[test]
    fn test_get_all_is_sorted() {
        let conn = setup_db();

        KvRepo::set(&conn, Namespace::Sync, "b", &json!(2)).unwrap();
        KvRepo::set(&conn, Namespace::Sync, "a", &json!(1)).unwrap();
        KvRepo::set(&conn, Namespace::Local, "c", &json!(3)).unwrap();

        let keys: Vec<String> = KvRepo::get_all(&conn, Namespace::Sync)
            .unwrap()
            .into_iter()
            .map(|e| e.key)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
