//! OpenAI adapter: chat completions for text, DALL-E 3 for images.

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatMessage, ContentProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const IMAGE_MODEL: &str = "dall-e-3";

pub struct OpenAiProvider {
    credential: Option<String>,
    model: String,
    base_url: String,
}

impl Default for OpenAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiProvider {
    pub fn new() -> Self {
        Self {
            credential: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Fixed credential instead of the environment lookup. Test hook.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn credential(&self) -> Option<String> {
        self.credential
            .clone()
            .or_else(|| super::resolve_credential(super::OPENAI_API_KEY_ENV))
    }

    fn require_credential(&self) -> ProviderResult<String> {
        self.credential()
            .ok_or_else(|| ProviderError::unauthorized("OpenAI", "OPENAI_API_KEY is not set"))
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

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    url: Option<String>,
    b64_json: Option<String>,
}

#[async_trait]
impl ContentProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn display_name(&self) -> &'static str {
        "OpenAI"
    }

    fn configured(&self) -> bool {
        self.credential().is_some()
    }

    async fn chat_completion(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        let credential = self.require_credential()?;

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.7,
        };

        let response = super::http_client()
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {credential}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("OpenAI", &e))?;

        if !response.status().is_success() {
            return Err(super::api_error("OpenAI", response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_transport("OpenAI", &e))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::unavailable("OpenAI", "empty completion response"))
    }

    async fn generate_image(&self, prompt: &str) -> ProviderResult<Option<String>> {
        let credential = self.require_credential()?;

        let request = ImageRequest {
            model: IMAGE_MODEL,
            prompt,
            n: 1,
            size: "1024x1024",
        };

        let response = super::http_client()
            .post(format!("{}/images/generations", self.base_url))
            .header("Authorization", format!("Bearer {credential}"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("OpenAI", &e))?;

        if !response.status().is_success() {
            return Err(super::api_error("OpenAI", response).await);
        }

        let images: ImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_transport("OpenAI", &e))?;

        let url = images.data.into_iter().next().and_then(|datum| {
            datum.url.or_else(|| {
                datum
                    .b64_json
                    .map(|b64| format!("data:image/png;base64,{b64}"))
            })
        });
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::error::ErrorKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn explicit_credential_configures() {
        let provider = OpenAiProvider::new().with_credential("sk-test");
        assert!(provider.configured());
        assert!(!provider.is_free());
    }

    #[tokio::test]
    async fn chat_parses_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new()
            .with_credential("sk-test")
            .with_base_url(server.uri());
        let reply = provider
            .chat_completion(&[ChatMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(reply, "hello");
    }

    #[tokio::test]
    async fn rate_limit_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "2")
                    .set_body_string("{\"error\": {\"message\": \"rate limit\"}}"),
            )
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new()
            .with_credential("sk-test")
            .with_base_url(server.uri());
        let err = provider
            .chat_completion(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn unauthorized_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new()
            .with_credential("sk-bad")
            .with_base_url(server.uri());
        let err = provider
            .chat_completion(&[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn image_generation_returns_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "created": 1700000000,
                "data": [{"url": "https://img.example/1.png"}]
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new()
            .with_credential("sk-test")
            .with_base_url(server.uri());
        let url = provider.generate_image("a rocket").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://img.example/1.png"));
    }

    #[test]
    fn request_serializes_messages_verbatim() {
        let messages = [ChatMessage::system("s"), ChatMessage::user("u")];
        let request = ChatCompletionRequest {
            model: DEFAULT_MODEL,
            messages: &messages,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
    }
}
