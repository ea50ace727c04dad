use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub znuny: ZnunyConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub defaults: UpdateDefaults,
    #[serde(default)]
    pub oracle: Option<OracleConfig>,
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
    5000
}

/// Ticketing backend (Znuny / OTRS GenericTicketConnectorREST) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZnunyConfig {
    /// REST web service base URL, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Agent login used to create sessions.
    #[serde(default)]
    pub user: String,
    /// Agent password.
    #[serde(default)]
    pub password: String,
    /// Per-request timeout in seconds (default: 10)
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u32,
    /// How long a created session is reused before logging in again.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    /// Externally supplied session token. Always wins over the cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Default for ZnunyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user: String::new(),
            password: String::new(),
            timeout_secs: default_backend_timeout(),
            session_ttl_secs: default_session_ttl(),
            session_id: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/otrs/nph-genericinterface.pl/Webservice/GenericTicketConnectorREST"
        .to_string()
}

fn default_backend_timeout() -> u32 {
    10
}

fn default_session_ttl() -> u64 {
    3300 // 55 minutes
}

/// Webhook event log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Append-only log of raw webhook events.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// Size at which the log is rotated to `<log_path>.1`.
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: u64,
    /// Upper bound on entries inspected by the fallback scan.
    #[serde(default = "default_max_scan_entries")]
    pub max_scan_entries: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            max_log_bytes: default_max_log_bytes(),
            max_scan_entries: default_max_scan_entries(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("logs/znuny_requests.log")
}

fn default_max_log_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_scan_entries() -> usize {
    500
}

/// Values used for ticket fields the caller did not set on write-back.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UpdateDefaults {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_customer_user")]
    pub customer_user: String,
    #[serde(default = "default_queue_id")]
    pub queue_id: u32,
    #[serde(default = "default_priority_id")]
    pub priority_id: u32,
    #[serde(default = "default_state_id")]
    pub state_id: u32,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl Default for UpdateDefaults {
    fn default() -> Self {
        Self {
            title: default_title(),
            customer_user: default_customer_user(),
            queue_id: default_queue_id(),
            priority_id: default_priority_id(),
            state_id: default_state_id(),
            subject: default_subject(),
            content_type: default_content_type(),
        }
    }
}

fn default_title() -> String {
    "Ticket diagnosed automatically".to_string()
}

fn default_customer_user() -> String {
    "root@localhost".to_string()
}

fn default_queue_id() -> u32 {
    1
}

fn default_priority_id() -> u32 {
    3 // normal
}

fn default_state_id() -> u32 {
    4 // open
}

fn default_subject() -> String {
    "Automatic diagnosis".to_string()
}

fn default_content_type() -> String {
    "text/plain; charset=utf8".to_string()
}

/// Diagnosis model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleProvider {
    Anthropic,
    Ollama,
    Gemini,
}

impl OracleProvider {
    /// Hosted providers refuse requests without an API key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, OracleProvider::Ollama)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OracleProvider::Anthropic => "anthropic",
            OracleProvider::Ollama => "ollama",
            OracleProvider::Gemini => "gemini",
        }
    }
}

/// Diagnosis oracle configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    pub provider: OracleProvider,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API base URL (for proxies or self-hosted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_oracle_timeout() -> u32 {
    30
}

fn default_max_tokens() -> u32 {
    1024
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub znuny: SanitizedZnunyConfig,
    pub webhook: WebhookConfig,
    pub defaults: UpdateDefaults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle: Option<SanitizedOracleConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedZnunyConfig {
    pub base_url: String,
    pub user: String,
    pub password_configured: bool,
    pub session_override: bool,
    pub timeout_secs: u32,
    pub session_ttl_secs: u64,
}

/// Sanitized oracle config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedOracleConfig {
    pub provider: String,
    pub model: String,
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            znuny: SanitizedZnunyConfig {
                base_url: config.znuny.base_url.clone(),
                user: config.znuny.user.clone(),
                password_configured: !config.znuny.password.is_empty(),
                session_override: config
                    .znuny
                    .session_id
                    .as_deref()
                    .is_some_and(|s| !s.trim().is_empty()),
                timeout_secs: config.znuny.timeout_secs,
                session_ttl_secs: config.znuny.session_ttl_secs,
            },
            webhook: config.webhook.clone(),
            defaults: config.defaults.clone(),
            oracle: config.oracle.as_ref().map(|o| SanitizedOracleConfig {
                provider: o.provider.as_str().to_string(),
                model: o.model.clone(),
                api_key_configured: o.api_key.as_ref().is_some_and(|k| !k.is_empty()),
                api_base: o.api_base.clone(),
                timeout_secs: o.timeout_secs,
            }),
        }
    }
}
