//! Gateway configuration.
//!
//! Configuration is an explicit object passed into [`crate::GatewayClient`]
//! at construction; there is no module-level cached key or lazily populated
//! global state.

use xlsmart_core::defaults;
use xlsmart_core::{Error, Result};

/// Default gateway base URL.
pub const DEFAULT_GATEWAY_URL: &str = "https://api.openai.com/v1";

/// API-key environment variables tried in priority order.
///
/// The deployment history left the key under several names; the first one
/// set wins.
pub const API_KEY_ENV_VARS: &[&str] = &["XLSMART_LLM_API_KEY", "LLM_API_KEY", "OPENAI_API_KEY"];

/// Configuration for the LLM gateway client.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL for the chat-completions endpoint.
    pub base_url: String,
    /// Bearer token for authentication.
    pub api_key: Option<String>,
    /// Model identifier sent with every request.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds (applied on the HTTP client).
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            api_key: None,
            model: defaults::GATEWAY_MODEL.to_string(),
            temperature: defaults::GATEWAY_TEMPERATURE,
            timeout_seconds: defaults::GATEWAY_TIMEOUT_SECS,
        }
    }
}

impl GatewayConfig {
    /// Build configuration from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `LLM_BASE_URL` | OpenAI v1 | Gateway base URL |
    /// | `XLSMART_LLM_API_KEY` / `LLM_API_KEY` / `OPENAI_API_KEY` | — | Bearer token (first set wins) |
    /// | `LLM_MODEL` | `gpt-4o-mini` | Model identifier |
    /// | `LLM_TEMPERATURE` | `0.3` | Sampling temperature |
    /// | `LLM_TIMEOUT_SECS` | `30` | Request timeout |
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
            api_key: resolve_api_key(),
            model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| defaults::GATEWAY_MODEL.to_string()),
            temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::GATEWAY_TEMPERATURE),
            timeout_seconds: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::GATEWAY_TIMEOUT_SECS),
        }
    }

    /// Fail early if no API key is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "No LLM API key configured (tried {})",
                API_KEY_ENV_VARS.join(", ")
            ))
        })
    }
}

/// Try each known API-key variable in priority order.
fn resolve_api_key() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.base_url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.model, defaults::GATEWAY_MODEL);
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout_seconds, defaults::GATEWAY_TIMEOUT_SECS);
    }

    #[test]
    fn require_api_key_errors_when_unset() {
        let config = GatewayConfig::default();
        let err = config.require_api_key().unwrap_err();
        assert!(err.to_string().contains("XLSMART_LLM_API_KEY"));
    }

    #[test]
    fn require_api_key_returns_key() {
        let config = GatewayConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert_eq!(config.require_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn fallback_chain_order() {
        assert_eq!(API_KEY_ENV_VARS[0], "XLSMART_LLM_API_KEY");
        assert_eq!(API_KEY_ENV_VARS.last(), Some(&"OPENAI_API_KEY"));
    }
}
