use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    pub ingress: IngressConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub support: SupportConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub responder: ResponderConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration for the query/command API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared bearer key, required when `method = "api_key"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Inbound email webhook configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngressConfig {
    /// Shared secret expected in the `token` query parameter
    pub token: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ticketflow.db")
}

/// Identity of the support desk itself
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupportConfig {
    /// Address the assistant replies as
    #[serde(default = "default_support_address")]
    pub address: String,
    /// Label rendered into subject tags, e.g. `[BEEF:abc123]`
    #[serde(default = "default_tag")]
    pub tag: String,
}

impl SupportConfig {
    /// Domain part of the support address (everything after `@`).
    pub fn domain(&self) -> Option<&str> {
        self.address
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .filter(|domain| !domain.is_empty())
    }
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            address: default_support_address(),
            tag: default_tag(),
        }
    }
}

fn default_support_address() -> String {
    "beefy@beef.support".to_string()
}

fn default_tag() -> String {
    "BEEF".to_string()
}

/// Event bus configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    /// Capacity of the publish channel
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Wall-clock budget for persistence and notification handlers; the
    /// responder uses `responder.timeout_secs`
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_secs: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            handler_timeout_secs: default_handler_timeout(),
        }
    }
}

fn default_buffer_size() -> usize {
    1000
}

fn default_handler_timeout() -> u64 {
    60
}

/// AI responder configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponderConfig {
    /// When disabled, `response.generate` events have no subscriber
    #[serde(default)]
    pub enabled: bool,
    /// OpenAI-compatible API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Model used when the latest message is text only
    #[serde(default = "default_text_model")]
    pub text_model: String,
    /// Model used when the latest message carries inline images
    #[serde(default = "default_vision_model")]
    pub vision_model: String,
    /// Name of the secret holding the API key
    #[serde(default = "default_responder_credential")]
    pub credential: String,
    /// Wall-clock budget for a single response generation
    #[serde(default = "default_responder_timeout")]
    pub timeout_secs: u64,
    /// System persona; the built-in persona is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: default_api_base(),
            text_model: default_text_model(),
            vision_model: default_vision_model(),
            credential: default_responder_credential(),
            timeout_secs: default_responder_timeout(),
            persona: None,
        }
    }
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_text_model() -> String {
    "gpt-4-turbo-preview".to_string()
}

fn default_vision_model() -> String {
    "gpt-4-vision-preview".to_string()
}

fn default_responder_credential() -> String {
    "openai".to_string()
}

fn default_responder_timeout() -> u64 {
    600
}

/// Outbound notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub backend: NotifierBackend,
    /// Sender address on outbound mail
    #[serde(default = "default_from_address")]
    pub from: String,
    /// Reply-To address, normally the inbound webhook mailbox
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// SendGrid-compatible API base URL
    #[serde(default = "default_sendgrid_base")]
    pub api_base: String,
    /// Name of the secret holding the transport API key
    #[serde(default = "default_notifier_credential")]
    pub credential: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            backend: NotifierBackend::default(),
            from: default_from_address(),
            reply_to: None,
            api_base: default_sendgrid_base(),
            credential: default_notifier_credential(),
        }
    }
}

/// Available outbound transports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierBackend {
    /// Write outgoing mail to the log only
    #[default]
    Log,
    #[serde(rename = "sendgrid")]
    SendGrid,
}

fn default_from_address() -> String {
    "support@beef.support".to_string()
}

fn default_sendgrid_base() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_notifier_credential() -> String {
    "sendgrid".to_string()
}

/// Secret resolution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub source: CredentialSourceKind,
    /// How long a resolved secret is reused before it is fetched again
    #[serde(default = "default_credential_ttl")]
    pub ttl_secs: u64,
    /// Prefix for environment lookups; `openai` resolves `TICKETFLOW_SECRET_OPENAI`
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,
    /// Inline secrets, used when `source = "static"`
    #[serde(default, skip_serializing)]
    pub values: HashMap<String, String>,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            source: CredentialSourceKind::default(),
            ttl_secs: default_credential_ttl(),
            env_prefix: default_env_prefix(),
            values: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSourceKind {
    #[default]
    Env,
    Static,
}

fn default_credential_ttl() -> u64 {
    300
}

fn default_env_prefix() -> String {
    "TICKETFLOW_SECRET_".to_string()
}
