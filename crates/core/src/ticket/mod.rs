//! Tickets: identity, conversation model and storage.

mod identity;
mod sqlite_store;
mod store;
mod types;

pub use identity::{IdentityResolver, ResolvedIdentity};
pub use sqlite_store::SqliteConversationStore;
pub use store::{ConversationStore, TicketError};
pub use types::{
    is_support_sender, Comment, CommentOrigin, MessageRef, TicketHeader, TicketStatus,
};
