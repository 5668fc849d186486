//! Testing utilities and mock implementations for pipeline tests.
//!
//! This module provides mock implementations of the external collaborators
//! (chat completions, mail delivery, the bus publisher), so the whole
//! pipeline can run against in-memory SQLite without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketflow_core::testing::{fixtures, MockChatClient, MockMailTransport};
//!
//! let client = MockChatClient::new();
//! let transport = MockMailTransport::new();
//!
//! client.set_response("Did you try water?").await;
//! ingress.receive(fixtures::inbound("Help me", "alice@example.com", "Fire!")).await?;
//!
//! assert_eq!(transport.sent().await.len(), 1);
//! ```

mod mock_chat_client;
mod mock_mail_transport;
mod mock_publisher;

pub use mock_chat_client::MockChatClient;
pub use mock_mail_transport::MockMailTransport;
pub use mock_publisher::RecordingPublisher;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;

    use crate::pipeline::InboundEmail;
    use crate::ticket::{Comment, CommentOrigin, MessageRef, TicketHeader};

    /// Raw plain-text RFC 822 message.
    pub fn raw_email(subject: &str, from: &str, body: &str) -> String {
        format!(
            "From: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
            from, subject, body
        )
    }

    /// Raw message whose body references one inline PNG as `[cid:<content_id>]`.
    pub fn raw_email_with_image(
        subject: &str,
        from: &str,
        body: &str,
        content_id: &str,
        png_base64: &str,
    ) -> String {
        format!(
            "From: {from}\r\n\
Subject: {subject}\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"FIXTURE\"\r\n\
\r\n\
--FIXTURE\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
{body}\r\n\
--FIXTURE\r\n\
Content-Type: image/png\r\n\
Content-Transfer-Encoding: base64\r\n\
Content-ID: <{content_id}>\r\n\
Content-Disposition: inline\r\n\
\r\n\
{png_base64}\r\n\
--FIXTURE--\r\n"
        )
    }

    /// Webhook payload for a plain-text message.
    pub fn inbound(subject: &str, from: &str, body: &str) -> InboundEmail {
        InboundEmail {
            subject: subject.to_string(),
            email: raw_email(subject, from, body),
        }
    }

    /// Header of a freshly opened ticket.
    pub fn header(ticket_id: &str, created_by: &str, subject: &str) -> TicketHeader {
        TicketHeader::opened(
            ticket_id,
            created_by,
            subject,
            MessageRef::next(ticket_id).as_str(),
        )
    }

    /// Comment with a fresh key.
    pub fn comment(ticket_id: &str, from: &str, message: &str, origin: CommentOrigin) -> Comment {
        Comment {
            ticket_id: ticket_id.to_string(),
            comment_key: MessageRef::next(ticket_id).into_string(),
            from: from.to_string(),
            message: message.to_string(),
            origin,
            last_updated: Utc::now(),
        }
    }
}
