use async_trait::async_trait;
use tracing::info;

use super::{MailTransport, OutboundMail, TransportError};

/// Transport that only logs what would have been sent. Default for local runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        info!(
            to = %mail.to,
            from = %mail.from,
            subject = %mail.subject,
            bytes = mail.text.len(),
            "Outbound mail (log transport)"
        );
        Ok(())
    }
}
