//! Mock chat client for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::responder::{ChatClient, ChatRequest, ChatResponse, LlmError};

/// Mock implementation of the ChatClient trait.
///
/// Provides controllable behavior for testing:
/// - Return a configurable completion
/// - Record every request for assertions
/// - Simulate upstream failures
///
/// # Example
///
/// ```rust,ignore
/// use ticketflow_core::testing::MockChatClient;
///
/// let client = MockChatClient::new();
/// client.set_response("Have you tried turning it off?").await;
///
/// // ... run the response worker ...
///
/// let requests = client.requests().await;
/// assert_eq!(requests[0].model, "gpt-4-turbo-preview");
/// ```
#[derive(Debug, Clone)]
pub struct MockChatClient {
    /// Text returned by the next completions.
    response: Arc<RwLock<String>>,
    /// Recorded requests.
    requests: Arc<RwLock<Vec<ChatRequest>>>,
    /// If set, the next completion will fail with this error.
    next_error: Arc<RwLock<Option<LlmError>>>,
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self {
            response: Arc::new(RwLock::new("Mock reply".to_string())),
            requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_response(&self, text: impl Into<String>) {
        *self.response.write().await = text.into();
    }

    /// Make the next completion fail.
    pub async fn fail_next(&self, error: LlmError) {
        *self.next_error.write().await = Some(error);
    }

    /// Requests received so far, including failed ones.
    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let model = request.model.clone();
        self.requests.write().await.push(request);

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        Ok(ChatResponse {
            text: self.response.read().await.clone(),
            model,
        })
    }
}
