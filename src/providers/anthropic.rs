//! Anthropic adapter over the Messages API.
//!
//! System prompts travel in the top-level `system` field, not the message
//! list; authentication uses the `x-api-key` header plus a pinned
//! `anthropic-version`.

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatMessage, ContentProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    credential: Option<String>,
    model: String,
    base_url: String,
}

impl Default for AnthropicProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AnthropicProvider {
    pub fn new() -> Self {
        Self {
            credential: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn credential(&self) -> Option<String> {
        self.credential
            .clone()
            .or_else(|| super::resolve_credential(super::ANTHROPIC_API_KEY_ENV))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<WireMessage>) {
    let mut system = Vec::new();
    let mut wire = Vec::new();
    for message in messages {
        if message.role == "system" {
            system.push(message.content.clone());
        } else {
            wire.push(WireMessage {
                role: message.role.clone(),
                content: message.content.clone(),
            });
        }
    }
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, wire)
}

#[async_trait]
impl ContentProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn display_name(&self) -> &'static str {
        "Anthropic Claude"
    }

    fn configured(&self) -> bool {
        self.credential().is_some()
    }

    async fn chat_completion(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        let credential = self.credential().ok_or_else(|| {
            ProviderError::unauthorized("Anthropic", "ANTHROPIC_API_KEY is not set")
        })?;

        let (system, wire) = split_system(messages);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: 1024,
            system,
            messages: wire,
        };

        let response = super::http_client()
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", credential)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("Anthropic", &e))?;

        if !response.status().is_success() {
            return Err(super::api_error("Anthropic", response).await);
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_transport("Anthropic", &e))?;

        let text: String = reply
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            return Err(ProviderError::unavailable(
                "Anthropic",
                "empty message response",
            ));
        }
        Ok(text)
    }
}
