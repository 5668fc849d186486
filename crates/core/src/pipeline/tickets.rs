//! Ticket reads and agent-submitted comments.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::PipelineError;
use crate::bus::{Channel, EventPublisher, EventSource, TicketEvent};
use crate::ticket::{Comment, CommentOrigin, ConversationStore, MessageRef, TicketHeader};

/// A ticket with its comments in stored order.
#[derive(Debug, Clone, Serialize)]
pub struct TicketView {
    pub header: TicketHeader,
    pub comments: Vec<Comment>,
}

/// Comment posted through the API.
#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub message: String,
    /// Defaults to external.
    #[serde(rename = "type", default)]
    pub origin: Option<CommentOrigin>,
    pub from: String,
}

impl NewComment {
    pub fn source(&self) -> EventSource {
        EventSource::new(
            self.origin.unwrap_or(CommentOrigin::External),
            Channel::Api,
        )
    }
}

pub struct TicketService {
    store: Arc<dyn ConversationStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl TicketService {
    pub fn new(store: Arc<dyn ConversationStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// All headers ordered by ticket id.
    pub fn list(&self) -> Result<Vec<TicketHeader>, PipelineError> {
        Ok(self.store.list_headers()?)
    }

    pub fn get(&self, ticket_id: &str) -> Result<TicketView, PipelineError> {
        let header = self
            .store
            .get_header(ticket_id)?
            .ok_or_else(|| PipelineError::TicketNotFound(ticket_id.to_string()))?;
        let comments = self.store.list_comments(ticket_id)?;
        Ok(TicketView { header, comments })
    }

    /// Publish a comment for an existing ticket.
    ///
    /// The comment is stored once the routed event is persisted, not here.
    pub async fn add_comment(
        &self,
        ticket_id: &str,
        comment: NewComment,
    ) -> Result<MessageRef, PipelineError> {
        if self.store.get_header(ticket_id)?.is_none() {
            return Err(PipelineError::TicketNotFound(ticket_id.to_string()));
        }

        let source = comment.source();
        let comment_ref = MessageRef::next(ticket_id);
        self.publisher
            .publish(
                source,
                TicketEvent::CommentAdded {
                    ticket_id: ticket_id.to_string(),
                    comment_ref: comment_ref.to_string(),
                    from: comment.from,
                    message: comment.message,
                },
            )
            .await?;

        info!(ticket_id = %ticket_id, source = %source, "Accepted API comment");
        Ok(comment_ref)
    }
}
