//! Raw inbound message storage.

mod sqlite;
mod store;

pub use sqlite::SqliteBlobStore;
pub use store::{Blob, BlobError, BlobStore, StoredMessage};
