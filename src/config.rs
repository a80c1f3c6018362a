//! Configuration management for the relay.
//!
//! Settings come from an optional YAML file layered under `RELAY_`-prefixed
//! environment variables (`RELAY_SECURITY__WEBHOOK_SECRET`, ...).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

use crate::error::{RelayError, Result};

/// Main configuration for the relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Deployment environment name ("development", "production", ...)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// WhatsApp Cloud API configuration
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Chat completion backend configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Webhook security configuration
    #[serde(default)]
    pub security: SecurityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Conversation window configuration
    #[serde(default)]
    pub conversation: ConversationConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            openai: OpenAiConfig::default(),
            security: SecurityConfig::default(),
            rate_limiting: RateLimitingConfig::default(),
            conversation: ConversationConfig::default(),
        }
    }
}

fn default_environment() -> String {
    "development".to_string()
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Bearer token for the conversation admin routes; routes are off when unset
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_body_bytes: default_max_body_bytes(),
            admin_token: None,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8000))
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Graph API base URL
    #[serde(default = "default_whatsapp_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Token echoed back during the webhook subscription handshake
    #[serde(default)]
    pub verify_token: Option<String>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_url: default_whatsapp_api_url(),
            access_token: None,
            phone_number_id: None,
            verify_token: None,
        }
    }
}

fn default_whatsapp_api_url() -> String {
    "https://graph.facebook.com/v16.0".to_string()
}

/// Chat completion backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL (without `/chat/completions`)
    #[serde(default = "default_openai_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// System prompt seeded into every new conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Reply sent when the backend cannot produce one
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_url: default_openai_api_url(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_temperature() -> f64 {
    0.7
}

fn default_system_prompt() -> String {
    "You are a helpful, friendly assistant replying through WhatsApp. \
     Keep your answers concise and relevant. \
     You can help with general questions, give advice and keep casual conversations."
        .to_string()
}

fn default_fallback_reply() -> String {
    "Sorry, I couldn't process your message right now. Please try again later.".to_string()
}

/// Webhook security configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared secret for `X-Hub-Signature-256`; verification is skipped when unset
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Requests admitted per user within the window
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Trailing window length in minutes
    #[serde(default = "default_window_minutes")]
    pub window_minutes: f64,

    /// Interval for evicting idle users; 0 disables the sweep
    #[serde(default)]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_minutes: default_window_minutes(),
            sweep_interval_secs: 0,
        }
    }
}

fn default_max_requests() -> usize {
    20
}

fn default_window_minutes() -> f64 {
    1.0
}

/// Conversation window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// History length that triggers trimming
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,

    /// Number of most recent messages kept after the system prompt
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            keep_recent: default_keep_recent(),
        }
    }
}

fn default_max_messages() -> usize {
    10
}

fn default_keep_recent() -> usize {
    8
}

fn environment_source() -> config::Environment {
    config::Environment::with_prefix("RELAY")
        .prefix_separator("_")
        .separator("__")
}

impl RelayConfig {
    /// Load configuration from an optional YAML file plus `RELAY_*` environment variables.
    ///
    /// Environment values stay strings until deserialization, so numeric-looking
    /// secrets keep their exact text.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment_source())
    }

    fn load_with_env(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let config: RelayConfig = builder.add_source(env).build()?.try_deserialize()?;

        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| RelayError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Whether this configuration targets production.
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check limiter settings, and that production deployments carry every
    /// credential they need.
    pub fn validate(&self) -> Result<()> {
        let window = self.rate_limiting.window_minutes;
        if !window.is_finite() || window <= 0.0 {
            return Err(RelayError::Config(format!(
                "rate_limiting.window_minutes must be a positive number, got {}",
                window
            )));
        }

        if !self.is_production() {
            return Ok(());
        }

        let required = [
            ("WHATSAPP_ACCESS_TOKEN", &self.whatsapp.access_token),
            ("WHATSAPP_PHONE_NUMBER_ID", &self.whatsapp.phone_number_id),
            ("WHATSAPP_VERIFY_TOKEN", &self.whatsapp.verify_token),
            ("OPENAI_API_KEY", &self.openai.api_key),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(RelayError::Config(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}
