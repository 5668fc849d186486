//! Secret retrieval for outbound integrations.

mod cache;
mod source;

pub use cache::CachedCredentialProvider;
pub use source::{EnvSecretSource, SecretSource, StaticSecretSource};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{CredentialSourceKind, CredentialsConfig};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential not found: {0}")]
    Missing(String),

    #[error("Credential source failed: {0}")]
    Source(String),
}

/// Resolves named secrets (API keys) for collaborators.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get(&self, name: &str) -> Result<String, CredentialError>;

    /// Drop any cached value, e.g. after the upstream rejected it.
    async fn invalidate(&self, name: &str);
}

/// Factory function to create the credential provider from config.
pub fn create_credential_provider(config: &CredentialsConfig) -> Arc<dyn CredentialProvider> {
    let source: Arc<dyn SecretSource> = match config.source {
        CredentialSourceKind::Env => Arc::new(EnvSecretSource::new(config.env_prefix.clone())),
        CredentialSourceKind::Static => Arc::new(StaticSecretSource::new(config.values.clone())),
    };
    Arc::new(CachedCredentialProvider::new(
        source,
        Duration::from_secs(config.ttl_secs),
    ))
}
