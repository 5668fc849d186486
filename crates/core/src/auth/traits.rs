use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

/// Why an issues API request was turned away.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No API key supplied (expected Authorization: Bearer or X-API-Key)")]
    MissingApiKey,

    #[error("API key does not match")]
    InvalidApiKey,

    /// The server itself is set up wrong; not the caller's fault.
    #[error("Issues API authentication is misconfigured: {0}")]
    Misconfigured(String),
}

/// Gatekeeper for the issues API.
///
/// The inbound email webhook is not covered: it carries its own `token`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Identify the support agent behind a request.
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name of this authentication method, as written in config.
    fn method_name(&self) -> &'static str;

    /// True when every request is let through without looking at headers.
    fn is_open(&self) -> bool {
        false
    }
}
