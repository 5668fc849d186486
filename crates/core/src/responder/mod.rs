//! AI reply generation.
//!
//! The worker turns a `response.generate` event into a chat completion and
//! publishes the reply as an `external.ai` comment. It is subscribed with
//! serial delivery, so at most one completion is in flight.

mod context;
mod llm;
mod worker;

pub use context::{build_messages, prior_comments, ModelSelection, DEFAULT_PERSONA};
pub use llm::{
    ChatClient, ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl, LlmError,
    OpenAiClient, Role, SamplingParams,
};
pub use worker::{ResponderSettings, ResponseWorker};

use std::sync::Arc;
use std::time::Duration;

use crate::config::ResponderConfig;
use crate::credentials::CredentialProvider;

/// Create the chat client for the configured endpoint.
pub fn create_chat_client(
    config: &ResponderConfig,
    credentials: Arc<dyn CredentialProvider>,
) -> Arc<dyn ChatClient> {
    Arc::new(
        OpenAiClient::new(credentials, config.credential.clone())
            .with_api_base(config.api_base.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs)),
    )
}
