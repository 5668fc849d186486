//! Generates the assistant reply for an inbound email.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::context::{build_messages, prior_comments, ModelSelection, DEFAULT_PERSONA};
use super::llm::{ChatClient, ChatRequest, LlmError, SamplingParams};
use crate::blob::BlobStore;
use crate::bus::{BusEnvelope, BusError, EventHandler, EventPublisher, EventSource, TicketEvent};
use crate::config::{ResponderConfig, SupportConfig};
use crate::mail::{latest_message, MailDecoder};
use crate::pipeline::PipelineError;
use crate::ticket::{ConversationStore, MessageRef};

/// Who the assistant is and which models it uses.
#[derive(Debug, Clone)]
pub struct ResponderSettings {
    pub models: ModelSelection,
    pub persona: String,
    /// Sender address of generated comments.
    pub support_address: String,
    /// Senders in this domain are replayed as assistant turns.
    pub support_domain: String,
}

impl ResponderSettings {
    pub fn from_config(responder: &ResponderConfig, support: &SupportConfig) -> Self {
        Self {
            models: ModelSelection {
                text_model: responder.text_model.clone(),
                vision_model: responder.vision_model.clone(),
            },
            persona: responder
                .persona
                .clone()
                .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            support_address: support.address.clone(),
            support_domain: support.domain().unwrap_or_default().to_string(),
        }
    }
}

/// Consumer of `response.generate`.
///
/// Upstream failures are logged and dropped: no comment is published and
/// nothing is retried.
pub struct ResponseWorker {
    blobs: Arc<dyn BlobStore>,
    store: Arc<dyn ConversationStore>,
    decoder: Arc<dyn MailDecoder>,
    client: Arc<dyn ChatClient>,
    publisher: Arc<dyn EventPublisher>,
    settings: ResponderSettings,
}

impl ResponseWorker {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        store: Arc<dyn ConversationStore>,
        decoder: Arc<dyn MailDecoder>,
        client: Arc<dyn ChatClient>,
        publisher: Arc<dyn EventPublisher>,
        settings: ResponderSettings,
    ) -> Self {
        Self {
            blobs,
            store,
            decoder,
            client,
            publisher,
            settings,
        }
    }

    /// Answer one inbound message. Returns the comment ref of the reply, if any.
    #[instrument(skip(self), fields(provider = self.client.provider()))]
    pub async fn respond(
        &self,
        ticket_id: &str,
        message_ref: &str,
    ) -> Result<Option<MessageRef>, PipelineError> {
        let stored = self.blobs.get_message(message_ref)?;
        let parsed = self.decoder.decode(stored.email.as_bytes())?;
        let latest = latest_message(&parsed);

        let comments = self.store.list_comments(ticket_id)?;
        let history = prior_comments(&comments);
        let messages = build_messages(
            &self.settings.persona,
            history,
            &latest,
            &self.settings.support_domain,
        );
        let model = self.settings.models.for_message(&latest).to_string();
        debug!(
            model = %model,
            history = history.len(),
            turns = messages.len(),
            "Requesting completion"
        );

        let request = ChatRequest {
            model,
            messages,
            sampling: SamplingParams::default(),
        };
        let response = match self.client.complete(request).await {
            Ok(response) => response,
            Err(LlmError::Api { status, message }) => {
                warn!(status, body = %message, "Completion rejected, dropping reply");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Completion failed, dropping reply");
                return Ok(None);
            }
        };

        let comment_ref = MessageRef::next(ticket_id);
        self.publisher
            .publish(
                EventSource::EXTERNAL_AI,
                TicketEvent::CommentAdded {
                    ticket_id: ticket_id.to_string(),
                    comment_ref: comment_ref.to_string(),
                    from: self.settings.support_address.clone(),
                    message: response.text,
                },
            )
            .await?;

        info!(model = %response.model, comment_ref = %comment_ref, "Published reply");
        Ok(Some(comment_ref))
    }
}

#[async_trait]
impl EventHandler for ResponseWorker {
    async fn handle(&self, envelope: &BusEnvelope) -> Result<(), BusError> {
        match &envelope.event {
            TicketEvent::ResponseRequested {
                ticket_id,
                message_ref,
            } => self
                .respond(ticket_id, message_ref)
                .await
                .map(|_| ())
                .map_err(BusError::from),
            _ => Ok(()),
        }
    }
}
