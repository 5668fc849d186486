//! Mock mail transport for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::outbound::{MailTransport, OutboundMail, TransportError};

/// Mail transport that records instead of sending.
#[derive(Debug, Clone, Default)]
pub struct MockMailTransport {
    sent: Arc<RwLock<Vec<OutboundMail>>>,
    /// If set, the next send will be rejected with this message.
    next_error: Arc<RwLock<Option<String>>>,
}

impl MockMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mails delivered so far.
    pub async fn sent(&self) -> Vec<OutboundMail> {
        self.sent.read().await.clone()
    }

    /// Reject the next send.
    pub async fn fail_next(&self, message: impl Into<String>) {
        *self.next_error.write().await = Some(message.into());
    }
}

#[async_trait]
impl MailTransport for MockMailTransport {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn send(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        if let Some(message) = self.next_error.write().await.take() {
            return Err(TransportError::Rejected {
                status: 500,
                message,
            });
        }
        self.sent.write().await.push(mail.clone());
        Ok(())
    }
}
