//! Inbound email decoding.

mod latest;
mod mime;

pub use latest::{latest_message, Fragment, LatestMessage, REPLY_SEPARATOR};
pub use mime::MimeMailDecoder;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Malformed email: {0}")]
    Malformed(String),
}

/// A decoded email, reduced to what the pipeline reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedMail {
    /// First sender address, if any.
    pub from: Option<String>,
    pub subject: Option<String>,
    /// Plain-text body with `\n` line endings. Empty when the message has none.
    pub text: String,
    pub attachments: Vec<InlineAttachment>,
}

impl ParsedMail {
    pub fn attachment(&self, content_id: &str) -> Option<&InlineAttachment> {
        self.attachments
            .iter()
            .find(|a| a.content_id.as_deref() == Some(content_id))
    }
}

/// A non-text MIME part.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineAttachment {
    /// `Content-ID` without angle brackets.
    pub content_id: Option<String>,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Decodes raw RFC 822 messages.
pub trait MailDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<ParsedMail, MailError>;
}
