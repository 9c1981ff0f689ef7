//! Replicate adapter, image generation only.
//!
//! Predictions run with `Prefer: wait` so a single POST blocks until the
//! output is ready (or the platform gives up and returns a still-running
//! prediction, which counts as unavailability here). Text methods report
//! invalid input so the router never routes chat traffic this way.

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatMessage, ContentProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";
const DEFAULT_MODEL: &str = "black-forest-labs/flux-schnell";

pub struct ReplicateProvider {
    credential: Option<String>,
    model: String,
    base_url: String,
}

impl Default for ReplicateProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicateProvider {
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
            .or_else(|| super::resolve_credential(super::REPLICATE_API_TOKEN_ENV))
    }
}

#[derive(Serialize)]
struct PredictionRequest<'a> {
    input: PredictionInput<'a>,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct PredictionResponse {
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

fn first_output_url(output: Option<serde_json::Value>) -> Option<String> {
    match output? {
        serde_json::Value::String(url) => Some(url),
        serde_json::Value::Array(items) => items.into_iter().find_map(|item| match item {
            serde_json::Value::String(url) => Some(url),
            _ => None,
        }),
        _ => None,
    }
}

#[async_trait]
impl ContentProvider for ReplicateProvider {
    fn name(&self) -> &'static str {
        "replicate"
    }

    fn display_name(&self) -> &'static str {
        "Replicate"
    }

    fn configured(&self) -> bool {
        self.credential().is_some()
    }

    async fn chat_completion(&self, _messages: &[ChatMessage]) -> ProviderResult<String> {
        Err(ProviderError::invalid_input(
            "Replicate",
            "text generation is not supported",
        ))
    }

    async fn generate_image(&self, prompt: &str) -> ProviderResult<Option<String>> {
        let credential = self.credential().ok_or_else(|| {
            ProviderError::unauthorized("Replicate", "REPLICATE_API_TOKEN is not set")
        })?;

        let request = PredictionRequest {
            input: PredictionInput { prompt },
        };

        let response = super::http_client()
            .post(format!(
                "{}/models/{}/predictions",
                self.base_url, self.model
            ))
            .header("Authorization", format!("Bearer {credential}"))
            .header("Prefer", "wait")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("Replicate", &e))?;

        if !response.status().is_success() {
            return Err(super::api_error("Replicate", response).await);
        }

        let prediction: PredictionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_transport("Replicate", &e))?;

        match prediction.status.as_str() {
            "succeeded" => Ok(first_output_url(prediction.output)),
            "failed" | "canceled" => Err(ProviderError::unavailable(
                "Replicate",
                super::sanitize_api_error(
                    &prediction.error.unwrap_or_else(|| prediction.status.clone()),
                ),
            )),
            // Still starting or processing after the wait window.
            other => Err(ProviderError::unavailable(
                "Replicate",
                format!("prediction still {other} after wait"),
            )),
        }
    }
}
