//! Access control for the issues API.
//!
//! Agents present a shared API key; local setups may run without one.

mod api_key;
mod none;
mod traits;
mod types;

pub use api_key::*;
pub use none::*;
pub use traits::*;
pub use types::*;

use std::sync::Arc;

use crate::config::{AuthConfig, AuthMethod};

/// Build the issues API authenticator selected in `[auth]`.
pub fn create_authenticator(config: &AuthConfig) -> Result<Arc<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Arc::new(NoneAuthenticator)),
        AuthMethod::ApiKey => match config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(Arc::new(ApiKeyAuthenticator::new(key))),
            _ => Err(AuthError::Misconfigured(
                "auth.api_key must be set when auth.method = \"api_key\"".to_string(),
            )),
        },
    }
}
