//! Unsplash adapter: stock photo search standing in for image generation.
//!
//! Not generative at all; the prompt becomes a search query and the first
//! hit's regular-size URL is returned. An empty result set is `Ok(None)` so
//! the router moves on instead of failing the request.

use super::error::{ProviderError, ProviderResult};
use super::traits::{ChatMessage, ContentProvider};
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.unsplash.com";

pub struct UnsplashProvider {
    credential: Option<String>,
    base_url: String,
}

impl Default for UnsplashProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl UnsplashProvider {
    pub fn new() -> Self {
        Self {
            credential: None,
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
            .or_else(|| super::resolve_credential(super::UNSPLASH_ACCESS_KEY_ENV))
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<Photo>,
}

#[derive(Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[async_trait]
impl ContentProvider for UnsplashProvider {
    fn name(&self) -> &'static str {
        "unsplash"
    }

    fn display_name(&self) -> &'static str {
        "Unsplash"
    }

    fn is_free(&self) -> bool {
        true
    }

    fn configured(&self) -> bool {
        self.credential().is_some()
    }

    async fn chat_completion(&self, _messages: &[ChatMessage]) -> ProviderResult<String> {
        Err(ProviderError::invalid_input(
            "Unsplash",
            "text generation is not supported",
        ))
    }

    async fn generate_image(&self, prompt: &str) -> ProviderResult<Option<String>> {
        let credential = self.credential().ok_or_else(|| {
            ProviderError::unauthorized("Unsplash", "UNSPLASH_ACCESS_KEY is not set")
        })?;

        let response = super::http_client()
            .get(format!("{}/search/photos", self.base_url))
            .header("Authorization", format!("Client-ID {credential}"))
            .query(&[("query", prompt), ("per_page", "1"), ("orientation", "landscape")])
            .send()
            .await
            .map_err(|e| ProviderError::from_transport("Unsplash", &e))?;

        if !response.status().is_success() {
            return Err(super::api_error("Unsplash", response).await);
        }

        let search: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_transport("Unsplash", &e))?;

        Ok(search.results.into_iter().next().map(|photo| photo.urls.regular))
    }
}
