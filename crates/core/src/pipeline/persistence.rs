//! Records routed comments and moves the ticket status.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use super::PipelineError;
use crate::bus::{BusEnvelope, BusError, EventHandler, TicketEvent};
use crate::ticket::{Comment, ConversationStore, TicketStatus};

/// Consumer of `comment.add` that appends the comment and updates the header.
pub struct CommentPersister {
    store: Arc<dyn ConversationStore>,
    support_domain: String,
}

impl CommentPersister {
    pub fn new(store: Arc<dyn ConversationStore>, support_domain: impl Into<String>) -> Self {
        Self {
            store,
            support_domain: support_domain.into(),
        }
    }

    pub async fn persist(&self, envelope: &BusEnvelope) -> Result<(), PipelineError> {
        let TicketEvent::CommentAdded {
            ticket_id,
            comment_ref,
            from,
            message,
        } = &envelope.event
        else {
            debug!(event_id = %envelope.id, "Ignoring non-comment event");
            return Ok(());
        };

        let now = Utc::now();
        let comment = Comment {
            ticket_id: ticket_id.clone(),
            comment_key: comment_ref.clone(),
            from: from.clone(),
            message: message.clone(),
            origin: envelope.source.origin,
            last_updated: now,
        };
        self.store.append_comment(&comment)?;

        // Blind overwrite: concurrent comments race and the last write wins.
        let status = TicketStatus::after_comment(from, &self.support_domain);
        self.store.update_header_status(ticket_id, status, now)?;

        info!(
            ticket_id = %ticket_id,
            comment_key = %comment_ref,
            origin = %comment.origin,
            status = %status,
            "Recorded comment"
        );
        Ok(())
    }
}

#[async_trait]
impl EventHandler for CommentPersister {
    async fn handle(&self, envelope: &BusEnvelope) -> Result<(), BusError> {
        self.persist(envelope).await.map_err(BusError::from)
    }
}
