use super::{types::Config, AuthMethod, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Ingress token is not empty
/// - API key present when api_key auth is selected
/// - Support address carries a domain and the tag label is alphanumeric
/// - Bus buffer is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.ingress.token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "ingress.token cannot be empty".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.as_deref().map_or(true, str::is_empty)
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key must be set when using api_key auth".to_string(),
        ));
    }

    if config.support.domain().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "support.address '{}' has no domain",
            config.support.address
        )));
    }

    if config.support.tag.is_empty()
        || !config.support.tag.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(ConfigError::ValidationError(
            "support.tag must be a non-empty alphanumeric label".to_string(),
        ));
    }

    if config.bus.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "bus.buffer_size cannot be 0".to_string(),
        ));
    }

    Ok(())
}
