//! Groq adapter over its OpenAI-compatible endpoint, with multi-key
//! rotation.
//!
//! Groq free-tier limits are per key, so the adapter keeps a [`KeyPool`] and
//! rotates to the next key on a 429 instead of burning a retry. Only when
//! every key is exhausted does the error surface to the router.

use super::error::{ErrorKind, ProviderError, ProviderResult};
use super::keypool::KeyPool;
use super::traits::{ChatMessage, ContentProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

// Rate-limited keys with no Retry-After hint sit out this long.
const DEFAULT_KEY_COOLDOWN: Duration = Duration::from_secs(60);

pub struct GroqProvider {
    pool: KeyPool,
    env_backed: bool,
    model: String,
    base_url: String,
}

impl Default for GroqProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GroqProvider {
    pub fn new() -> Self {
        Self {
            pool: KeyPool::from_env(super::GROQ_API_KEY_ENV),
            env_backed: true,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Fixed key set detached from the environment. Test hook.
    pub fn with_keys(keys: Vec<String>) -> Self {
        Self {
            pool: KeyPool::new(keys),
            env_backed: false,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn refresh_pool(&self) {
        if self.env_backed {
            self.pool.sync_env(super::GROQ_API_KEY_ENV);
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ContentProvider for GroqProvider {
    fn name(&self) -> &'static str {
        "groq"
    }

    fn display_name(&self) -> &'static str {
        "Groq"
    }

    fn is_free(&self) -> bool {
        true
    }

    fn configured(&self) -> bool {
        self.refresh_pool();
        !self.pool.is_empty()
    }

    async fn chat_completion(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        self.refresh_pool();
        if self.pool.is_empty() {
            return Err(ProviderError::unauthorized(
                "Groq",
                "GROQ_API_KEY is not set",
            ));
        }

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.7,
        };

        let mut last_rate_limit: Option<ProviderError> = None;

        // Each key gets one shot per call; rotation covers the retry budget
        // a single-key provider would spend on backoff.
        for _ in 0..self.pool.len() {
            let Some(key) = self.pool.current() else {
                break;
            };

            let response = super::http_client()
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {key}"))
                .json(&request)
                .send()
                .await
                .map_err(|e| ProviderError::from_transport("Groq", &e))?;

            if !response.status().is_success() {
                let err = super::api_error("Groq", response).await;
                if err.kind() == ErrorKind::RateLimited {
                    tracing::debug!(
                        provider = "groq",
                        error = %err,
                        "Key rate limited, rotating to next pool entry"
                    );
                    self.pool
                        .mark_exhausted(&key, Some(err.retry_after().unwrap_or(DEFAULT_KEY_COOLDOWN)));
                    last_rate_limit = Some(err);
                    continue;
                }
                return Err(err);
            }

            self.pool.mark_active(&key);
            let completion: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::from_transport("Groq", &e))?;

            return completion
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .filter(|content| !content.trim().is_empty())
                .ok_or_else(|| ProviderError::unavailable("Groq", "empty completion response"));
        }

        Err(last_rate_limit.unwrap_or_else(|| {
            ProviderError::unavailable("Groq", "all API keys are rate limited")
        }))
    }
}
