use thiserror::Error;

use crate::blob::BlobError;
use crate::bus::BusError;
use crate::mail::MailError;
use crate::outbound::TransportError;
use crate::responder::LlmError;
use crate::ticket::TicketError;

/// Error of any pipeline stage, classified for callers.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Forbidden")]
    Unauthorized,

    #[error("Ticket does not exist: {0}")]
    TicketNotFound(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Store error: {0}")]
    Store(TicketError),

    #[error("Blob error: {0}")]
    Blob(#[from] BlobError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Upstream failure: {0}")]
    Upstream(#[from] LlmError),

    #[error("Delivery failure: {0}")]
    Delivery(#[from] TransportError),
}

impl PipelineError {
    /// HTTP status this error maps to at the API edge.
    pub fn http_status(&self) -> u16 {
        match self {
            PipelineError::Unauthorized => 403,
            PipelineError::TicketNotFound(_) => 404,
            PipelineError::MalformedInput(_) => 400,
            PipelineError::Upstream(_) | PipelineError::Delivery(_) => 502,
            PipelineError::Bus(BusError::Full) => 503,
            PipelineError::Store(_) | PipelineError::Blob(_) | PipelineError::Bus(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PipelineError::TicketNotFound(_))
    }
}

impl From<TicketError> for PipelineError {
    fn from(e: TicketError) -> Self {
        match e {
            TicketError::NotFound(id) => PipelineError::TicketNotFound(id),
            other => PipelineError::Store(other),
        }
    }
}

impl From<MailError> for PipelineError {
    fn from(e: MailError) -> Self {
        PipelineError::MalformedInput(e.to_string())
    }
}

impl From<PipelineError> for BusError {
    fn from(e: PipelineError) -> Self {
        BusError::Handler(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(PipelineError::Unauthorized.http_status(), 403);
        assert_eq!(
            PipelineError::from(TicketError::NotFound("abc".to_string())).http_status(),
            404
        );
        assert_eq!(
            PipelineError::from(MailError::Malformed("x".to_string())).http_status(),
            400
        );
        assert_eq!(
            PipelineError::from(TicketError::Database("locked".to_string())).http_status(),
            500
        );
        assert_eq!(PipelineError::Bus(BusError::Full).http_status(), 503);
        assert_eq!(PipelineError::Bus(BusError::Closed).http_status(), 500);
    }

    #[test]
    fn test_not_found_message() {
        let err = PipelineError::from(TicketError::NotFound("6ab2f5c2".to_string()));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Ticket does not exist: 6ab2f5c2");
    }
}
