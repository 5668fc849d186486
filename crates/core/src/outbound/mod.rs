//! Outbound email delivery.

mod logging;
mod sendgrid;

pub use logging::LogTransport;
pub use sendgrid::SendGridTransport;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{NotifierBackend, NotifierConfig};
use crate::credentials::{CredentialError, CredentialProvider};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Provider rejected message: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// A plain-text email to a ticket owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMail {
    pub to: String,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
}

/// Delivers outbound mail.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Transport name, for logs.
    fn name(&self) -> &'static str;

    async fn send(&self, mail: &OutboundMail) -> Result<(), TransportError>;
}

/// Factory function to create the configured transport.
pub fn create_transport(
    config: &NotifierConfig,
    credentials: Arc<dyn CredentialProvider>,
) -> Arc<dyn MailTransport> {
    match config.backend {
        NotifierBackend::Log => Arc::new(LogTransport),
        NotifierBackend::SendGrid => Arc::new(
            SendGridTransport::new(credentials, config.credential.clone())
                .with_api_base(config.api_base.clone()),
        ),
    }
}
