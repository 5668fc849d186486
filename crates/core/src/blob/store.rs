use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Blob not found: {0}")]
    NotFound(String),
}

/// A stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub key: String,
    pub content: Vec<u8>,
    pub content_type: String,
    pub stored_at: DateTime<Utc>,
}

/// Raw inbound email as received by ingress, stored under its message reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMessage {
    pub subject: String,
    /// Full RFC 822 message.
    pub email: String,
}

impl StoredMessage {
    pub const CONTENT_TYPE: &'static str = "application/json";

    pub fn to_bytes(&self) -> Result<Vec<u8>, BlobError> {
        serde_json::to_vec(self).map_err(|e| BlobError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BlobError> {
        serde_json::from_slice(bytes).map_err(|e| BlobError::Serialization(e.to_string()))
    }
}

/// Durable key to bytes storage.
pub trait BlobStore: Send + Sync {
    /// Store (or replace) an object.
    fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), BlobError>;

    /// Fetch an object by key.
    fn get(&self, key: &str) -> Result<Option<Blob>, BlobError>;

    /// Store an inbound message under `key`.
    fn put_message(&self, key: &str, message: &StoredMessage) -> Result<(), BlobError> {
        self.put(key, &message.to_bytes()?, StoredMessage::CONTENT_TYPE)
    }

    /// Load an inbound message. Missing keys are an error.
    fn get_message(&self, key: &str) -> Result<StoredMessage, BlobError> {
        let blob = self
            .get(key)?
            .ok_or_else(|| BlobError::NotFound(key.to_string()))?;
        StoredMessage::from_bytes(&blob.content)
    }
}
