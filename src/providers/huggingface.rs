//! Hugging Face adapter over the router's OpenAI-compatible chat endpoint.

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatMessage, ContentProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
const DEFAULT_MODEL: &str = "meta-llama/Llama-3.1-8B-Instruct";

pub struct HuggingFaceProvider {
    credential: Option<String>,
    model: String,
    base_url: String,
}

impl Default for HuggingFaceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HuggingFaceProvider {
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
            .or_else(|| super::resolve_credential(super::HUGGING_FACE_TOKEN_ENV))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
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
impl ContentProvider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn display_name(&self) -> &'static str {
        "Hugging Face"
    }

    fn is_free(&self) -> bool {
        true
    }

    fn configured(&self) -> bool {
        self.credential().is_some()
    }

    async fn chat_completion(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        let credential = self.credential().ok_or_else(|| {
            ProviderError::unauthorized("HuggingFace", "HUGGING_FACE_TOKEN is not set")
        })?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.7,
            max_tokens: 2048,
        };

        let response = super::http_client()
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {credential}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("HuggingFace", &e))?;

        if !response.status().is_success() {
            return Err(super::api_error("HuggingFace", response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_transport("HuggingFace", &e))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::unavailable("HuggingFace", "empty completion response"))
    }
}
