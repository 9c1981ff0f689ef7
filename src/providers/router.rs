//! Retry and fallback orchestration across registered providers.
//!
//! The router owns the walk: pick the active provider, retry it according to
//! the shared [`RetryPolicy`], then try each configured fallback in order.
//! Adapters never retry themselves (Groq's in-call key rotation is the one
//! exception, and that rotates keys rather than repeating a key).
//!
//! Invalid input is the short circuit: it aborts the walk immediately since
//! no provider can fix a malformed request.

use super::error::{ErrorKind, ProviderError};
use super::registry::{ProviderName, ProviderRegistry};
use super::retry::RetryPolicy;
use super::selector::ActiveSelector;
use super::traits::{
    ChatGenRequest, ContentProvider, ContentRequest, GenerationResult, PlatformContent,
    ProviderInfo,
};
use anyhow::Result;
use std::sync::Arc;

/// A routed value plus where it actually came from.
#[derive(Debug, Clone)]
pub struct Routed<T> {
    pub provider: ProviderName,
    pub fell_back: bool,
    pub value: T,
}

pub struct ContentRouter {
    registry: ProviderRegistry,
    selector: ActiveSelector,
    chat_fallbacks: Vec<ProviderName>,
    image_order: Vec<ProviderName>,
    retry: RetryPolicy,
}

impl ContentRouter {
    pub fn new(
        registry: ProviderRegistry,
        selector: ActiveSelector,
        chat_fallbacks: Vec<ProviderName>,
        image_order: Vec<ProviderName>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            selector,
            chat_fallbacks,
            image_order,
            retry,
        }
    }

    /// The provider the next request would use, for status reporting.
    pub fn active_info(&self) -> Result<(ProviderName, ProviderInfo)> {
        let (name, provider) = self.selector.active(&self.registry)?;
        Ok((name, provider.info()))
    }

    /// Retry one provider until the policy gives up, returning the last error.
    async fn attempt_content(
        &self,
        name: ProviderName,
        provider: &Arc<dyn ContentProvider>,
        request: &ContentRequest,
    ) -> Result<Vec<PlatformContent>, ProviderError> {
        let mut attempt = 0u32;
        loop {
            match provider.generate_content(request).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !self.retry.should_retry(attempt, &err) {
                        return Err(err);
                    }
                    let delay = self.retry.backoff(attempt, &err);
                    tracing::warn!(
                        provider = name.as_str(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Provider call failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt_chat(
        &self,
        name: ProviderName,
        provider: &Arc<dyn ContentProvider>,
        request: &ChatGenRequest,
    ) -> Result<GenerationResult, ProviderError> {
        let mut attempt = 0u32;
        loop {
            match provider.generate_chat(request).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !self.retry.should_retry(attempt, &err) {
                        return Err(err);
                    }
                    let delay = self.retry.backoff(attempt, &err);
                    tracing::warn!(
                        provider = name.as_str(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Provider call failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Fallback candidates: configured providers from the chat fallback
    /// list, minus the one that already failed.
    fn fallback_candidates(&self, active: ProviderName) -> Vec<(ProviderName, Arc<dyn ContentProvider>)> {
        self.chat_fallbacks
            .iter()
            .filter(|name| **name != active)
            .filter_map(|name| self.registry.get(*name).ok().map(|p| (*name, p)))
            .filter(|(_, provider)| provider.configured())
            .collect()
    }

    /// Multi-platform content generation with retry and fallback.
    pub async fn route_content(&self, request: &ContentRequest) -> Result<Routed<Vec<PlatformContent>>> {
        let (active_name, active) = self.selector.active(&self.registry)?;
        let mut failures: Vec<String> = Vec::new();

        match self.attempt_content(active_name, &active, request).await {
            Ok(value) => {
                return Ok(Routed {
                    provider: active_name,
                    fell_back: false,
                    value,
                })
            }
            Err(err) => {
                if !err.kind().routes_to_fallback() {
                    return Err(err.into());
                }
                failures.push(format!("provider={active_name}: {err}"));
            }
        }

        for (name, provider) in self.fallback_candidates(active_name) {
            tracing::info!(
                provider = name.as_str(),
                failed = active_name.as_str(),
                "Falling back to next provider"
            );
            match self.attempt_content(name, &provider, request).await {
                Ok(value) => {
                    return Ok(Routed {
                        provider: name,
                        fell_back: true,
                        value,
                    })
                }
                Err(err) => {
                    if !err.kind().routes_to_fallback() {
                        return Err(err.into());
                    }
                    failures.push(format!("provider={name}: {err}"));
                }
            }
        }

        anyhow::bail!(
            "All providers failed for content generation: {}",
            failures.join(" | ")
        )
    }

    /// Conversational generation with retry and fallback.
    pub async fn route_chat(&self, request: &ChatGenRequest) -> Result<Routed<GenerationResult>> {
        let (active_name, active) = self.selector.active(&self.registry)?;
        let mut failures: Vec<String> = Vec::new();

        match self.attempt_chat(active_name, &active, request).await {
            Ok(value) => {
                return Ok(Routed {
                    provider: active_name,
                    fell_back: false,
                    value,
                })
            }
            Err(err) => {
                if !err.kind().routes_to_fallback() {
                    return Err(err.into());
                }
                failures.push(format!("provider={active_name}: {err}"));
            }
        }

        for (name, provider) in self.fallback_candidates(active_name) {
            tracing::info!(
                provider = name.as_str(),
                failed = active_name.as_str(),
                "Falling back to next provider"
            );
            match self.attempt_chat(name, &provider, request).await {
                Ok(value) => {
                    return Ok(Routed {
                        provider: name,
                        fell_back: true,
                        value,
                    })
                }
                Err(err) => {
                    if !err.kind().routes_to_fallback() {
                        return Err(err.into());
                    }
                    failures.push(format!("provider={name}: {err}"));
                }
            }
        }

        anyhow::bail!(
            "All providers failed for chat generation: {}",
            failures.join(" | ")
        )
    }

    /// Walk the image order until a provider produces a URL.
    ///
    /// Unconfigured providers are skipped; `Ok(None)` (no capability or no
    /// hit) moves on without counting as a failure; errors are recorded and
    /// the walk continues. The mock floor means a default order cannot
    /// dead-end, but a custom order can, so exhaustion is still an error.
    pub async fn route_image(&self, prompt: &str) -> Result<Routed<String>> {
        let mut failures: Vec<String> = Vec::new();
        let mut first = true;

        for name in &self.image_order {
            let provider = self.registry.get(*name)?;
            if !provider.configured() {
                first = false;
                continue;
            }

            let mut attempt = 0u32;
            let outcome = loop {
                match provider.generate_image(prompt).await {
                    Ok(value) => break Ok(value),
                    Err(err) => {
                        if !self.retry.should_retry(attempt, &err) {
                            break Err(err);
                        }
                        let delay = self.retry.backoff(attempt, &err);
                        tracing::warn!(
                            provider = name.as_str(),
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "Image generation failed, backing off before retry"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                }
            };

            match outcome {
                Ok(Some(url)) => {
                    return Ok(Routed {
                        provider: *name,
                        fell_back: !first,
                        value: url,
                    })
                }
                Ok(None) => {
                    tracing::debug!(
                        provider = name.as_str(),
                        "No image from provider, trying next in order"
                    );
                }
                Err(err) => {
                    if err.kind() == ErrorKind::InvalidInput {
                        return Err(err.into());
                    }
                    tracing::warn!(
                        provider = name.as_str(),
                        error = %err,
                        "Image provider failed, trying next in order"
                    );
                    failures.push(format!("provider={name}: {err}"));
                }
            }
            first = false;
        }

        anyhow::bail!(
            "All providers failed for image generation: {}",
            failures.join(" | ")
        )
    }
}
