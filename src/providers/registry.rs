use super::traits::ContentProvider;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Canonical provider identifiers. Parsing is case-insensitive and accepts
/// the common aliases seen in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    Openai,
    Gemini,
    Anthropic,
    Groq,
    Huggingface,
    Replicate,
    Unsplash,
    Mock,
}

impl ProviderName {
    /// Every known provider, in display order.
    pub const ALL: [ProviderName; 8] = [
        Self::Openai,
        Self::Gemini,
        Self::Anthropic,
        Self::Groq,
        Self::Huggingface,
        Self::Replicate,
        Self::Unsplash,
        Self::Mock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::Groq => "groq",
            Self::Huggingface => "huggingface",
            Self::Replicate => "replicate",
            Self::Unsplash => "unsplash",
            Self::Mock => "mock",
        }
    }

    /// Default cost-ordered preference for text generation, free tiers first.
    pub fn default_preference() -> Vec<ProviderName> {
        vec![
            Self::Groq,
            Self::Gemini,
            Self::Anthropic,
            Self::Openai,
            Self::Huggingface,
        ]
    }

    /// Default fallback chain for chat after the active provider fails.
    pub fn default_chat_fallbacks() -> Vec<ProviderName> {
        vec![Self::Gemini, Self::Anthropic, Self::Openai]
    }

    /// Default walk order for image generation. Mock is last and always
    /// succeeds, so an image request never dead-ends.
    pub fn default_image_order() -> Vec<ProviderName> {
        vec![Self::Openai, Self::Replicate, Self::Unsplash, Self::Mock]
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" | "chatgpt" => Ok(Self::Openai),
            "gemini" | "google" => Ok(Self::Gemini),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "groq" => Ok(Self::Groq),
            "huggingface" | "hugging-face" | "hf" => Ok(Self::Huggingface),
            "replicate" => Ok(Self::Replicate),
            "unsplash" => Ok(Self::Unsplash),
            "mock" => Ok(Self::Mock),
            other => bail!(
                "Unknown provider '{other}'. Valid providers: openai, gemini, \
                 anthropic, groq, huggingface, replicate, unsplash, mock"
            ),
        }
    }
}

/// Immutable name-to-adapter map built once at startup.
///
/// Lookup failure is a configuration bug, not a runtime condition, so `get`
/// returns a hard error rather than silently skipping the entry.
pub struct ProviderRegistry {
    providers: HashMap<ProviderName, Arc<dyn ContentProvider>>,
}

impl ProviderRegistry {
    pub fn new(providers: HashMap<ProviderName, Arc<dyn ContentProvider>>) -> Self {
        Self { providers }
    }

    pub fn get(&self, name: ProviderName) -> Result<Arc<dyn ContentProvider>> {
        match self.providers.get(&name) {
            Some(provider) => Ok(Arc::clone(provider)),
            None => bail!("Provider '{name}' is not registered"),
        }
    }

    pub fn contains(&self, name: ProviderName) -> bool {
        self.providers.contains_key(&name)
    }

    pub fn names(&self) -> impl Iterator<Item = ProviderName> + '_ {
        self.providers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
