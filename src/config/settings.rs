// Configuration structs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use super::constants::{
    DEFAULT_BODY_LIMIT_BYTES, DEFAULT_HTTP_ADDR, DEFAULT_MAX_TOKENS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use super::provider::{ProviderEntry, StoreEntry};
use crate::instruction::ContentPolicy;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Assistant behaviour (reply size, insufficient-context threshold)
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// LLM provider to stream completions from
    pub provider: ProviderEntry,

    /// Portfolio record source
    #[serde(default)]
    pub store: StoreEntry,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8000")
    pub bind_address: String,
    /// Hard bound on one chat exchange, in seconds
    pub request_timeout_secs: u64,
    /// Maximum accepted request body size
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_HTTP_ADDR.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

/// Assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Maximum tokens per reply
    pub max_tokens: u32,
    /// Optional model override (uses provider default if not specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Optional sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Portfolios with fewer non-whitespace characters of content than this
    /// get the canned insufficient-information reply
    pub min_content_chars: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            model: None,
            temperature: None,
            min_content_chars: ContentPolicy::default().min_content_chars,
        }
    }
}

impl AssistantConfig {
    pub fn content_policy(&self) -> ContentPolicy {
        ContentPolicy::new(self.min_content_chars)
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.bind_address))
    }
}

impl Config {
    /// Configuration with defaults for everything but the provider
    pub fn with_provider(provider: ProviderEntry) -> Self {
        Self {
            server: ServerConfig::default(),
            assistant: AssistantConfig::default(),
            provider,
            store: StoreEntry::default(),
        }
    }

    /// Validate configuration and return helpful errors
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;

        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be greater than zero");
        }
        if self.assistant.max_tokens == 0 {
            bail!("assistant.max_tokens must be greater than zero");
        }
        if let Some(t) = self.assistant.temperature {
            if !(0.0..=2.0).contains(&t) {
                bail!("assistant.temperature must be between 0.0 and 2.0, got {}", t);
            }
        }
        if let Some(key) = self.provider.api_key() {
            if key.trim().is_empty() {
                bail!(
                    "API key for provider {} is empty",
                    self.provider.display_name()
                );
            }
        }
        if let StoreEntry::Instant {
            app_id,
            admin_token,
            ..
        } = &self.store
        {
            if app_id.trim().is_empty() || admin_token.trim().is_empty() {
                bail!("InstantDB store requires both app_id and admin_token");
            }
        }

        Ok(())
    }
}
