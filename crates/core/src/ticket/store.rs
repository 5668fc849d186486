//! Conversation storage trait and errors.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::ticket::{Comment, TicketHeader, TicketStatus};

/// Error type for conversation store operations.
#[derive(Debug)]
pub enum TicketError {
    /// Ticket has no header.
    NotFound(String),
    /// A header already exists for this ticket.
    AlreadyExists(String),
    /// Database error.
    Database(String),
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketError::NotFound(id) => write!(f, "Ticket does not exist: {}", id),
            TicketError::AlreadyExists(id) => write!(f, "Ticket already exists: {}", id),
            TicketError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for TicketError {}

/// Trait for conversation storage backends.
///
/// A ticket is one header plus an ordered list of comments. Comments are
/// append-only and replaying them in key order gives conversation order.
pub trait ConversationStore: Send + Sync {
    /// Get the header of a ticket.
    fn get_header(&self, ticket_id: &str) -> Result<Option<TicketHeader>, TicketError>;

    /// Store the header of a new ticket. Fails with `AlreadyExists` if one is present.
    fn create_header(&self, header: &TicketHeader) -> Result<(), TicketError>;

    /// Overwrite status and `last_updated`. Last writer wins.
    fn update_header_status(
        &self,
        ticket_id: &str,
        status: TicketStatus,
        at: DateTime<Utc>,
    ) -> Result<TicketHeader, TicketError>;

    /// Append a comment. Fails with `NotFound` and leaves the store untouched
    /// when the ticket has no header. Re-appending the same key overwrites it.
    fn append_comment(&self, comment: &Comment) -> Result<(), TicketError>;

    /// All comments of a ticket in key order.
    fn list_comments(&self, ticket_id: &str) -> Result<Vec<Comment>, TicketError>;

    /// All headers ordered by ticket id.
    fn list_headers(&self) -> Result<Vec<TicketHeader>, TicketError>;
}
