//! SQLite-backed conversation store.
//!
//! Headers and comments share one table keyed by `(pk, sk)`: the ticket id is
//! the partition key, `HEADER` or `COMMENT#<key>` the sort key.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Comment, CommentOrigin, ConversationStore, TicketError, TicketHeader, TicketStatus};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const HEADER_SK: &str = "HEADER";
const COMMENT_SK_PREFIX: &str = "COMMENT#";

/// SQLite-backed conversation store.
pub struct SqliteConversationStore {
    conn: Mutex<Connection>,
}

impl SqliteConversationStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(|e| TicketError::Database(e.to_string()))?;
        // Other stores may share the file.
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversation (
                pk TEXT NOT NULL,
                sk TEXT NOT NULL,
                created_by TEXT,
                subject TEXT,
                status TEXT,
                original_id TEXT,
                sender TEXT,
                message TEXT,
                origin TEXT,
                last_updated TEXT NOT NULL,
                PRIMARY KEY (pk, sk)
            );

            CREATE INDEX IF NOT EXISTS idx_conversation_sk_pk ON conversation(sk, pk);
            "#,
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(())
    }

    fn comment_sk(comment_key: &str) -> String {
        format!("{}{}", COMMENT_SK_PREFIX, comment_key)
    }

    fn corrupt(column: usize, message: String) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
    }

    fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Self::corrupt(column, format!("Invalid timestamp '{}': {}", raw, e)))
    }

    fn row_to_header(row: &rusqlite::Row) -> rusqlite::Result<TicketHeader> {
        let ticket_id: String = row.get(0)?;
        let created_by: Option<String> = row.get(1)?;
        let subject: Option<String> = row.get(2)?;
        let status: String = row.get(3)?;
        let last_updated: String = row.get(4)?;
        let original_id: Option<String> = row.get(5)?;

        let status = status
            .parse::<TicketStatus>()
            .map_err(|e| Self::corrupt(3, e))?;

        Ok(TicketHeader {
            ticket_id,
            created_by: created_by.unwrap_or_default(),
            subject: subject.unwrap_or_default(),
            status,
            last_updated: Self::parse_timestamp(4, &last_updated)?,
            original_id: original_id.unwrap_or_default(),
        })
    }

    fn row_to_comment(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
        let ticket_id: String = row.get(0)?;
        let sk: String = row.get(1)?;
        let sender: Option<String> = row.get(2)?;
        let message: Option<String> = row.get(3)?;
        let origin: String = row.get(4)?;
        let last_updated: String = row.get(5)?;

        let comment_key = sk
            .strip_prefix(COMMENT_SK_PREFIX)
            .unwrap_or(&sk)
            .to_string();
        let origin = origin
            .parse::<CommentOrigin>()
            .map_err(|e| Self::corrupt(4, e))?;

        Ok(Comment {
            ticket_id,
            comment_key,
            from: sender.unwrap_or_default(),
            message: message.unwrap_or_default(),
            origin,
            last_updated: Self::parse_timestamp(5, &last_updated)?,
        })
    }

    fn query_header(conn: &Connection, ticket_id: &str) -> Result<Option<TicketHeader>, TicketError> {
        conn.query_row(
            "SELECT pk, created_by, subject, status, last_updated, original_id FROM conversation WHERE pk = ? AND sk = ?",
            params![ticket_id, HEADER_SK],
            Self::row_to_header,
        )
        .optional()
        .map_err(|e| TicketError::Database(e.to_string()))
    }
}

impl ConversationStore for SqliteConversationStore {
    fn get_header(&self, ticket_id: &str) -> Result<Option<TicketHeader>, TicketError> {
        let conn = self.conn.lock().unwrap();
        Self::query_header(&conn, ticket_id)
    }

    fn create_header(&self, header: &TicketHeader) -> Result<(), TicketError> {
        let conn = self.conn.lock().unwrap();

        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO conversation (pk, sk, created_by, subject, status, original_id, last_updated) VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    header.ticket_id,
                    HEADER_SK,
                    header.created_by,
                    header.subject,
                    header.status.as_str(),
                    header.original_id,
                    header.last_updated.to_rfc3339(),
                ],
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        if inserted == 0 {
            return Err(TicketError::AlreadyExists(header.ticket_id.clone()));
        }

        Ok(())
    }

    fn update_header_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<TicketHeader, TicketError> {
        let conn = self.conn.lock().unwrap();

        let updated = conn
            .execute(
                "UPDATE conversation SET status = ?, last_updated = ? WHERE pk = ? AND sk = ?",
                params![status.as_str(), at.to_rfc3339(), ticket_id, HEADER_SK],
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(TicketError::NotFound(ticket_id.to_string()));
        }

        Self::query_header(&conn, ticket_id)?
            .ok_or_else(|| TicketError::NotFound(ticket_id.to_string()))
    }

    fn append_comment(&self, comment: &Comment) -> Result<(), TicketError> {
        let mut conn = self.conn.lock().unwrap();

        let tx = conn
            .transaction()
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let has_header: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM conversation WHERE pk = ? AND sk = ?)",
                params![comment.ticket_id, HEADER_SK],
                |row| row.get(0),
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        if !has_header {
            return Err(TicketError::NotFound(comment.ticket_id.clone()));
        }

        tx.execute(
            "INSERT OR REPLACE INTO conversation (pk, sk, sender, message, origin, last_updated) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                comment.ticket_id,
                Self::comment_sk(&comment.comment_key),
                comment.from,
                comment.message,
                comment.origin.as_str(),
                comment.last_updated.to_rfc3339(),
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(())
    }

    fn list_comments(&self, ticket_id: &str) -> Result<Vec<Comment>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT pk, sk, sender, message, origin, last_updated FROM conversation WHERE pk = ? AND sk LIKE 'COMMENT#%' ORDER BY sk ASC",
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![ticket_id], Self::row_to_comment)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut comments = Vec::new();
        for row_result in rows {
            let comment = row_result.map_err(|e| TicketError::Database(e.to_string()))?;
            comments.push(comment);
        }

        Ok(comments)
    }

    fn list_headers(&self) -> Result<Vec<TicketHeader>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT pk, created_by, subject, status, last_updated, original_id FROM conversation WHERE sk = ? ORDER BY pk ASC",
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![HEADER_SK], Self::row_to_header)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut headers = Vec::new();
        for row_result in rows {
            let header = row_result.map_err(|e| TicketError::Database(e.to_string()))?;
            headers.push(header);
        }

        Ok(headers)
    }
}
