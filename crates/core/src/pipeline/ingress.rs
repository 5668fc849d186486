//! Inbound email intake.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use super::PipelineError;
use crate::blob::{BlobStore, StoredMessage};
use crate::bus::{EventPublisher, EventSource, TicketEvent};
use crate::mail::{latest_message, MailDecoder};
use crate::ticket::{ConversationStore, IdentityResolver, MessageRef, TicketHeader, TicketStatus};

/// Sender recorded when the message has no usable `From`.
pub const UNKNOWN_SENDER: &str = "unknown";

/// Fields of an inbound-email webhook call.
#[derive(Debug, Clone)]
pub struct InboundEmail {
    pub subject: String,
    /// Raw RFC 822 message.
    pub email: String,
}

/// What ingress did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressOutcome {
    pub ticket_id: String,
    pub message_ref: MessageRef,
    pub is_new: bool,
}

/// Turns inbound email into ticket state and bus events.
pub struct IngressService {
    store: Arc<dyn ConversationStore>,
    blobs: Arc<dyn BlobStore>,
    decoder: Arc<dyn MailDecoder>,
    resolver: IdentityResolver,
    publisher: Arc<dyn EventPublisher>,
}

impl IngressService {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        blobs: Arc<dyn BlobStore>,
        decoder: Arc<dyn MailDecoder>,
        resolver: IdentityResolver,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            blobs,
            decoder,
            resolver,
            publisher,
        }
    }

    /// Accept one inbound email.
    ///
    /// Steps: decode, resolve the ticket, store the raw message, open or
    /// touch the header, then publish `comment.add` and `response.generate`.
    /// Nothing is written when decoding fails or a tagged ticket is unknown.
    #[instrument(skip_all, fields(subject = %inbound.subject))]
    pub async fn receive(&self, inbound: InboundEmail) -> Result<IngressOutcome, PipelineError> {
        let parsed = self.decoder.decode(inbound.email.as_bytes())?;
        let from = parsed
            .from
            .clone()
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        let latest = latest_message(&parsed);

        let identity = self.resolver.resolve(&inbound.subject);
        if !identity.is_new && self.store.get_header(&identity.ticket_id)?.is_none() {
            return Err(PipelineError::TicketNotFound(identity.ticket_id));
        }

        let message_ref = MessageRef::next(&identity.ticket_id);
        self.blobs.put_message(
            message_ref.as_str(),
            &StoredMessage {
                subject: inbound.subject.clone(),
                email: inbound.email,
            },
        )?;

        if identity.is_new {
            let header = TicketHeader::opened(
                &identity.ticket_id,
                &from,
                self.resolver.tag_subject(&inbound.subject, &identity.ticket_id),
                message_ref.as_str(),
            );
            self.store.create_header(&header)?;
            info!(ticket_id = %identity.ticket_id, from = %from, "Opened ticket");
        } else {
            self.store.update_header_status(
                &identity.ticket_id,
                TicketStatus::CustomerResponse,
                Utc::now(),
            )?;
            info!(ticket_id = %identity.ticket_id, from = %from, "Customer replied to ticket");
        }

        self.publisher
            .publish(
                EventSource::EXTERNAL_EMAIL,
                TicketEvent::CommentAdded {
                    ticket_id: identity.ticket_id.clone(),
                    comment_ref: message_ref.to_string(),
                    from,
                    message: latest.raw,
                },
            )
            .await?;

        self.publisher
            .publish(
                EventSource::EXTERNAL_EMAIL,
                TicketEvent::ResponseRequested {
                    ticket_id: identity.ticket_id.clone(),
                    message_ref: message_ref.to_string(),
                },
            )
            .await?;

        Ok(IngressOutcome {
            ticket_id: identity.ticket_id,
            message_ref,
            is_new: identity.is_new,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::SqliteBlobStore;
    use crate::mail::MimeMailDecoder;
    use crate::testing::{fixtures, RecordingPublisher};
    use crate::ticket::SqliteConversationStore;

    struct Harness {
        store: Arc<SqliteConversationStore>,
        blobs: Arc<SqliteBlobStore>,
        publisher: Arc<RecordingPublisher>,
        service: IngressService,
    }

    fn harness() -> Harness {
        let store = Arc::new(SqliteConversationStore::in_memory().unwrap());
        let blobs = Arc::new(SqliteBlobStore::in_memory().unwrap());
        let publisher = Arc::new(RecordingPublisher::new());
        let service = IngressService::new(
            store.clone(),
            blobs.clone(),
            Arc::new(MimeMailDecoder),
            IdentityResolver::new("BEEF").unwrap(),
            publisher.clone(),
        );
        Harness {
            store,
            blobs,
            publisher,
            service,
        }
    }

    #[tokio::test]
    async fn test_new_ticket_from_untagged_subject() {
        let h = harness();

        let outcome = h
            .service
            .receive(fixtures::inbound("Help me", "alice@example.com", "My printer is on fire."))
            .await
            .unwrap();

        assert!(outcome.is_new);
        let header = h.store.get_header(&outcome.ticket_id).unwrap().unwrap();
        assert_eq!(header.status, TicketStatus::New);
        assert_eq!(header.created_by, "alice@example.com");
        assert_eq!(header.subject, format!("Help me [BEEF:{}]", outcome.ticket_id));
        assert_eq!(header.original_id, outcome.message_ref.as_str());

        let stored = h.blobs.get_message(outcome.message_ref.as_str()).unwrap();
        assert_eq!(stored.subject, "Help me");

        // Comments only land once the routed event is persisted.
        assert!(h.store.list_comments(&outcome.ticket_id).unwrap().is_empty());

        let events = h.publisher.published().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0, EventSource::EXTERNAL_EMAIL);
        match &events[0].1 {
            TicketEvent::CommentAdded {
                ticket_id,
                comment_ref,
                from,
                message,
            } => {
                assert_eq!(ticket_id, &outcome.ticket_id);
                assert_eq!(comment_ref, outcome.message_ref.as_str());
                assert_eq!(from, "alice@example.com");
                assert!(message.contains("My printer is on fire."));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            events[1].1,
            TicketEvent::ResponseRequested {
                ticket_id: outcome.ticket_id.clone(),
                message_ref: outcome.message_ref.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_reply_to_existing_ticket_does_not_create_header() {
        let h = harness();
        let first = h
            .service
            .receive(fixtures::inbound("Help me", "alice@example.com", "Broken"))
            .await
            .unwrap();

        let reply_subject = format!("Re: Help me [BEEF:{}]", first.ticket_id);
        let second = h
            .service
            .receive(fixtures::inbound(&reply_subject, "alice@example.com", "Still broken"))
            .await
            .unwrap();

        assert!(!second.is_new);
        assert_eq!(second.ticket_id, first.ticket_id);
        assert_eq!(h.store.list_headers().unwrap().len(), 1);

        let header = h.store.get_header(&first.ticket_id).unwrap().unwrap();
        assert_eq!(header.status, TicketStatus::CustomerResponse);
        assert_eq!(header.original_id, first.message_ref.as_str());
        assert!(second.message_ref > first.message_ref);
    }

    #[tokio::test]
    async fn test_unknown_tagged_ticket_is_not_found() {
        let h = harness();

        let result = h
            .service
            .receive(fixtures::inbound("Re: [BEEF:deadbeef]", "alice@example.com", "hello?"))
            .await;

        assert!(matches!(result, Err(PipelineError::TicketNotFound(id)) if id == "deadbeef"));
        assert!(h.store.list_headers().unwrap().is_empty());
        assert!(h.publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_email_is_malformed() {
        let h = harness();

        let result = h
            .service
            .receive(InboundEmail {
                subject: "Help".to_string(),
                email: String::new(),
            })
            .await;

        assert!(matches!(result, Err(PipelineError::MalformedInput(_))));
        assert!(h.store.list_headers().unwrap().is_empty());
        assert!(h.publisher.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_from_is_unknown() {
        let h = harness();
        let email = "Subject: Help\r\n\r\nNo sender here\r\n".to_string();

        let outcome = h
            .service
            .receive(InboundEmail {
                subject: "Help".to_string(),
                email,
            })
            .await
            .unwrap();

        let header = h.store.get_header(&outcome.ticket_id).unwrap().unwrap();
        assert_eq!(header.created_by, UNKNOWN_SENDER);
    }
}
