use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Blob, BlobError, BlobStore};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed blob store
pub struct SqliteBlobStore {
    conn: Mutex<Connection>,
}

impl SqliteBlobStore {
    pub fn new(path: &Path) -> Result<Self, BlobError> {
        let conn = Connection::open(path).map_err(|e| BlobError::Database(e.to_string()))?;
        // Other stores may share the file.
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| BlobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, BlobError> {
        let conn = Connection::open_in_memory().map_err(|e| BlobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), BlobError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                content BLOB NOT NULL,
                content_type TEXT NOT NULL,
                stored_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| BlobError::Database(e.to_string()))
    }
}

impl BlobStore for SqliteBlobStore {
    fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), BlobError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT OR REPLACE INTO blobs (key, content, content_type, stored_at) VALUES (?, ?, ?, ?)",
            params![key, content, content_type, Utc::now().to_rfc3339()],
        )
        .map_err(|e| BlobError::Database(e.to_string()))?;

        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Blob>, BlobError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT key, content, content_type, stored_at FROM blobs WHERE key = ?",
            params![key],
            |row| {
                let stored_at: String = row.get(3)?;
                Ok(Blob {
                    key: row.get(0)?,
                    content: row.get(1)?,
                    content_type: row.get(2)?,
                    stored_at: DateTime::parse_from_rfc3339(&stored_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            },
        )
        .optional()
        .map_err(|e| BlobError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::StoredMessage;

    #[test]
    fn test_put_and_get() {
        let store = SqliteBlobStore::in_memory().unwrap();

        store.put("k1", b"\x00\x01raw", "application/octet-stream").unwrap();

        let blob = store.get("k1").unwrap().unwrap();
        assert_eq!(blob.content, b"\x00\x01raw");
        assert_eq!(blob.content_type, "application/octet-stream");
    }

    #[test]
    fn test_get_missing() {
        let store = SqliteBlobStore::in_memory().unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces() {
        let store = SqliteBlobStore::in_memory().unwrap();
        store.put("k1", b"first", "text/plain").unwrap();
        store.put("k1", b"second", "text/plain").unwrap();

        assert_eq!(store.get("k1").unwrap().unwrap().content, b"second");
    }

    #[test]
    fn test_message_helpers() {
        let store = SqliteBlobStore::in_memory().unwrap();
        let message = StoredMessage {
            subject: "Help me".to_string(),
            email: "From: a@b.c\r\n\r\nbody".to_string(),
        };

        store.put_message("abc12345.0001700000000000", &message).unwrap();

        assert_eq!(
            store.get_message("abc12345.0001700000000000").unwrap(),
            message
        );
        assert!(matches!(
            store.get_message("missing"),
            Err(BlobError::NotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_message_is_serialization_error() {
        let store = SqliteBlobStore::in_memory().unwrap();
        store.put("bad", b"not json", "application/json").unwrap();

        assert!(matches!(
            store.get_message("bad"),
            Err(BlobError::Serialization(_))
        ));
    }
}
