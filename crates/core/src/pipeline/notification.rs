//! Emails the ticket owner about new external comments.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::PipelineError;
use crate::bus::{BusEnvelope, BusError, EventHandler, TicketEvent};
use crate::outbound::{MailTransport, OutboundMail};
use crate::ticket::{ConversationStore, TicketHeader, TicketStatus};

/// Consumer of external `comment.add` events that notifies the ticket creator.
pub struct CommentNotifier {
    store: Arc<dyn ConversationStore>,
    transport: Arc<dyn MailTransport>,
    from: String,
    reply_to: Option<String>,
}

impl CommentNotifier {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        transport: Arc<dyn MailTransport>,
        from: impl Into<String>,
        reply_to: Option<String>,
    ) -> Self {
        Self {
            store,
            transport,
            from: from.into(),
            reply_to,
        }
    }

    pub async fn notify(&self, envelope: &BusEnvelope) -> Result<(), PipelineError> {
        let TicketEvent::CommentAdded {
            ticket_id,
            from,
            message,
            ..
        } = &envelope.event
        else {
            debug!(event_id = %envelope.id, "Ignoring non-comment event");
            return Ok(());
        };

        let header = self
            .store
            .get_header(ticket_id)?
            .ok_or_else(|| PipelineError::TicketNotFound(ticket_id.clone()))?;

        let mail = OutboundMail {
            to: header.created_by.clone(),
            from: self.from.clone(),
            reply_to: self.reply_to.clone(),
            subject: reply_subject(&header.subject),
            text: notification_body(&header, from, message),
        };
        self.transport.send(&mail).await?;

        info!(
            ticket_id = %ticket_id,
            to = %mail.to,
            transport = self.transport.name(),
            "Notified ticket owner"
        );
        Ok(())
    }
}

#[async_trait]
impl EventHandler for CommentNotifier {
    async fn handle(&self, envelope: &BusEnvelope) -> Result<(), BusError> {
        self.notify(envelope).await.map_err(BusError::from)
    }
}

/// Subject with a single `Re: ` prefix.
pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with("Re:") {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}

/// Body of the notification, depending on whether the ticket was just opened.
pub fn notification_body(header: &TicketHeader, from: &str, message: &str) -> String {
    if header.status == TicketStatus::New {
        format!(
            "Your ticket has been created! Someone will attack you shortly!\n\nOriginal message:\n\n{}",
            message
        )
    } else {
        format!(
            "A new comment was added on your ticket by {}:\n\n{}",
            from, message
        )
    }
}
