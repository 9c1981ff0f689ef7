//! Google Gemini adapter over the v1beta generateContent API.
//!
//! Gemini has no "system" role on the wire; system messages map to the
//! `systemInstruction` field and the rest of the conversation to `contents`
//! with `user`/`model` roles.

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatMessage, ContentProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiProvider {
    credential: Option<String>,
    model: String,
    base_url: String,
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiProvider {
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
            .or_else(|| super::resolve_credential(super::GEMINI_API_KEY_ENV))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn build_request(messages: &[ChatMessage]) -> GenerateContentRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        match message.role.as_str() {
            "system" => system_parts.push(Part {
                text: message.content.clone(),
            }),
            role => contents.push(Content {
                role: Some(if role == "assistant" { "model" } else { "user" }.to_string()),
                parts: vec![Part {
                    text: message.content.clone(),
                }],
            }),
        }
    }

    GenerateContentRequest {
        system_instruction: (!system_parts.is_empty()).then(|| Content {
            role: None,
            parts: system_parts,
        }),
        contents,
        generation_config: GenerationConfig {
            temperature: 0.7,
            max_output_tokens: 2048,
        },
    }
}

#[async_trait]
impl ContentProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Google Gemini"
    }

    fn is_free(&self) -> bool {
        true
    }

    fn configured(&self) -> bool {
        self.credential().is_some()
    }

    async fn chat_completion(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        let credential = self.credential().ok_or_else(|| {
            ProviderError::unauthorized("Gemini", "GEMINI_API_KEY is not set")
        })?;

        let request = build_request(messages);

        let response = super::http_client()
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", credential)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("Gemini", &e))?;

        if !response.status().is_success() {
            return Err(super::api_error("Gemini", response).await);
        }

        let generated: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_transport("Gemini", &e))?;

        generated
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ProviderError::unavailable("Gemini", "empty candidate response"))
    }
}
