use std::collections::HashMap;

use async_trait::async_trait;

use super::CredentialError;

/// Where secrets ultimately come from.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the current value of the secret called `name`.
    async fn fetch(&self, name: &str) -> Result<String, CredentialError>;

    /// Name of this source, for logs.
    fn name(&self) -> &'static str;
}

/// Reads secrets from environment variables.
///
/// `openai` with prefix `TICKETFLOW_SECRET_` reads `TICKETFLOW_SECRET_OPENAI`.
pub struct EnvSecretSource {
    prefix: String,
}

impl EnvSecretSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn variable_for(&self, name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn fetch(&self, name: &str) -> Result<String, CredentialError> {
        let variable = self.variable_for(name);
        match std::env::var(&variable) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Err(CredentialError::Missing(format!(
                "{} (expected in ${})",
                name, variable
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

/// Secrets given inline in the configuration file.
#[derive(Default)]
pub struct StaticSecretSource {
    values: HashMap<String, String>,
}

impl StaticSecretSource {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretSource for StaticSecretSource {
    async fn fetch(&self, name: &str) -> Result<String, CredentialError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| CredentialError::Missing(name.to_string()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
