use crate::providers::registry::ProviderName;
use crate::providers::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Retry and fallback knobs for the provider router.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityConfig {
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    /// Cost-ordered provider preference for selecting the active provider.
    pub preference: Vec<ProviderName>,
    /// Providers tried, in order, after the active provider fails a chat or
    /// content call.
    pub chat_fallbacks: Vec<ProviderName>,
    /// Walk order for image generation.
    pub image_order: Vec<ProviderName>,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff_ms: 250,
            preference: ProviderName::default_preference(),
            chat_fallbacks: ProviderName::default_chat_fallbacks(),
            image_order: ProviderName::default_image_order(),
        }
    }
}

impl ReliabilityConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.base_backoff_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub reliability: ReliabilityConfig,
    /// Serve mock content even when credentials are present.
    pub use_mock: bool,
}

impl Config {
    /// Assemble configuration from the environment. Everything has a default;
    /// nothing here can fail except a malformed provider list, which is a
    /// deployment typo worth stopping for.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Config {
            use_mock: env_truthy("USE_MOCK_AI"),
            ..Config::default()
        };

        if let Ok(host) = std::env::var("POSTFORGE_HOST") {
            if !host.trim().is_empty() {
                config.gateway.host = host.trim().to_string();
            }
        }
        if let Ok(port) = std::env::var("POSTFORGE_PORT") {
            if !port.trim().is_empty() {
                config.gateway.port = port.trim().parse().map_err(|_| {
                    anyhow::anyhow!("POSTFORGE_PORT must be a port number, got '{port}'")
                })?;
            }
        }
        if let Some(list) = env_provider_list("POSTFORGE_PROVIDER_ORDER")? {
            config.reliability.preference = list;
        }
        if let Some(list) = env_provider_list("POSTFORGE_CHAT_FALLBACKS")? {
            config.reliability.chat_fallbacks = list;
        }
        if let Some(list) = env_provider_list("POSTFORGE_IMAGE_ORDER")? {
            config.reliability.image_order = list;
        }

        Ok(config)
    }
}

/// Truthy environment flag: `1`, `true`, `yes`, `on` (case-insensitive).
pub fn env_truthy(var: &str) -> bool {
    std::env::var(var)
        .map(|value| {
            matches!(
                value.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

fn env_provider_list(var: &str) -> anyhow::Result<Option<Vec<ProviderName>>> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let names = raw
        .split(',')
        .map(|part| ProviderName::from_str(part.trim()))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Some(names))
}
