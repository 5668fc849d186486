use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CredentialError, CredentialProvider, SecretSource};

#[derive(Clone)]
struct CachedSecret {
    value: String,
    fetched_at: Instant,
}

/// Credential provider that keeps fetched secrets for a fixed time-to-live.
///
/// The cache belongs to the provider instance. Expired entries are refetched
/// on the next lookup.
pub struct CachedCredentialProvider {
    source: Arc<dyn SecretSource>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedSecret>>,
}

impl CachedCredentialProvider {
    pub fn new(source: Arc<dyn SecretSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn cached(&self, name: &str) -> Option<String> {
        let cache = self.cache.read().await;
        cache
            .get(name)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl CredentialProvider for CachedCredentialProvider {
    async fn get(&self, name: &str) -> Result<String, CredentialError> {
        if let Some(value) = self.cached(name).await {
            return Ok(value);
        }

        debug!(secret = name, source = self.source.name(), "Fetching credential");
        let value = self.source.fetch(name).await?;

        let mut cache = self.cache.write().await;
        cache.insert(
            name.to_string(),
            CachedSecret {
                value: value.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(value)
    }

    async fn invalidate(&self, name: &str) {
        self.cache.write().await.remove(name);
    }
}
