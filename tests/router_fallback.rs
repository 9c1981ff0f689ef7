//! Integration tests for provider selection, retry, and fallback.
//!
//! These exercise the router through the public API with scripted providers,
//! validating the walk semantics end to end without touching any vendor API.

use async_trait::async_trait;
use postforge::providers::error::{ErrorKind, ProviderError, ProviderResult};
use postforge::providers::mock::MockProvider;
use postforge::providers::registry::{ProviderName, ProviderRegistry};
use postforge::providers::retry::RetryPolicy;
use postforge::providers::selector::ActiveSelector;
use postforge::providers::traits::{ChatGenRequest, ChatMessage, ContentProvider, ContentRequest};
use postforge::providers::ContentRouter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Provider that fails a fixed number of times before succeeding.
struct RecoveringProvider {
    name: &'static str,
    failures_before_success: usize,
    kind: ErrorKind,
    calls: AtomicUsize,
}

impl RecoveringProvider {
    fn new(name: &'static str, failures_before_success: usize, kind: ErrorKind) -> Arc<Self> {
        Arc::new(Self {
            name,
            failures_before_success,
            kind,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ContentProvider for RecoveringProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn display_name(&self) -> &'static str {
        self.name
    }

    fn configured(&self) -> bool {
        true
    }

    async fn chat_completion(&self, _messages: &[ChatMessage]) -> ProviderResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures_before_success {
            return Err(ProviderError::new(self.name, self.kind, "transient"));
        }
        Ok(format!(
            "{{\"content\": \"recovered on call {}\", \"hashtags\": [\"ok\"]}}",
            call + 1
        ))
    }
}

struct Setup {
    providers: HashMap<ProviderName, Arc<dyn ContentProvider>>,
    preference: Vec<ProviderName>,
}

impl Setup {
    fn new() -> Self {
        let mut providers: HashMap<ProviderName, Arc<dyn ContentProvider>> = HashMap::new();
        providers.insert(ProviderName::Mock, Arc::new(MockProvider::new()));
        Self {
            providers,
            preference: vec![],
        }
    }

    fn with(mut self, name: ProviderName, provider: Arc<dyn ContentProvider>) -> Self {
        self.providers.insert(name, provider);
        self.preference.push(name);
        self
    }

    fn router(self, fallbacks: Vec<ProviderName>, retries: u32) -> ContentRouter {
        ContentRouter::new(
            ProviderRegistry::new(self.providers),
            ActiveSelector::new(self.preference, false),
            fallbacks,
            vec![ProviderName::Mock],
            RetryPolicy::new(retries, 50),
        )
    }
}

fn request() -> ContentRequest {
    ContentRequest::new(vec!["x".into()], "integration test topic")
}

#[tokio::test]
async fn transient_outage_recovers_on_retry_without_fallback() {
    let groq = RecoveringProvider::new("groq", 1, ErrorKind::ServiceUnavailable);
    let router = Setup::new()
        .with(ProviderName::Groq, groq.clone())
        .router(vec![], 2);

    let routed = router.route_content(&request()).await.unwrap();
    assert_eq!(routed.provider, ProviderName::Groq);
    assert!(!routed.fell_back);
    assert_eq!(groq.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn persistent_outage_exhausts_retries_then_falls_back() {
    let groq = RecoveringProvider::new("groq", usize::MAX, ErrorKind::ServiceUnavailable);
    let gemini = RecoveringProvider::new("gemini", 0, ErrorKind::ServiceUnavailable);
    let router = Setup::new()
        .with(ProviderName::Groq, groq.clone())
        .with(ProviderName::Gemini, gemini.clone())
        .router(vec![ProviderName::Gemini], 1);

    let routed = router.route_content(&request()).await.unwrap();
    assert_eq!(routed.provider, ProviderName::Gemini);
    assert!(routed.fell_back);
    // Initial attempt plus one retry on the active provider.
    assert_eq!(groq.calls.load(Ordering::SeqCst), 2);
    assert_eq!(gemini.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unauthorized_never_retries_the_same_provider() {
    let groq = RecoveringProvider::new("groq", usize::MAX, ErrorKind::Unauthorized);
    let gemini = RecoveringProvider::new("gemini", 0, ErrorKind::ServiceUnavailable);
    let router = Setup::new()
        .with(ProviderName::Groq, groq.clone())
        .with(ProviderName::Gemini, gemini.clone())
        .router(vec![ProviderName::Gemini], 3);

    let routed = router.route_content(&request()).await.unwrap();
    assert_eq!(routed.provider, ProviderName::Gemini);
    assert_eq!(groq.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_error_is_retried_exactly_once() {
    let groq = RecoveringProvider::new("groq", usize::MAX, ErrorKind::Unknown);
    let gemini = RecoveringProvider::new("gemini", 0, ErrorKind::ServiceUnavailable);
    let router = Setup::new()
        .with(ProviderName::Groq, groq.clone())
        .with(ProviderName::Gemini, gemini.clone())
        .router(vec![ProviderName::Gemini], 3);

    let routed = router.route_content(&request()).await.unwrap();
    assert_eq!(routed.provider, ProviderName::Gemini);
    assert_eq!(groq.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalid_input_short_circuits_everything() {
    let groq = RecoveringProvider::new("groq", 0, ErrorKind::ServiceUnavailable);
    let gemini = RecoveringProvider::new("gemini", 0, ErrorKind::ServiceUnavailable);
    let router = Setup::new()
        .with(ProviderName::Groq, groq.clone())
        .with(ProviderName::Gemini, gemini.clone())
        .router(vec![ProviderName::Gemini], 3);

    let empty = ContentRequest::new(vec![], "topic");
    assert!(router.route_content(&empty).await.is_err());
    assert_eq!(groq.calls.load(Ordering::SeqCst), 0);
    assert_eq!(gemini.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mock_serves_when_nothing_is_configured() {
    let router = Setup::new().router(vec![], 1);
    let routed = router.route_content(&request()).await.unwrap();
    assert_eq!(routed.provider, ProviderName::Mock);
    assert!(!routed.fell_back);
    assert_eq!(routed.value.len(), 1);
    assert!(routed.value[0].content.contains("integration test topic"));
}

#[tokio::test]
async fn chat_walk_preserves_suggestion_count() {
    let groq = RecoveringProvider::new("groq", usize::MAX, ErrorKind::RateLimited);
    let gemini = RecoveringProvider::new("gemini", 0, ErrorKind::ServiceUnavailable);
    let router = Setup::new()
        .with(ProviderName::Groq, groq)
        .with(ProviderName::Gemini, gemini)
        .router(vec![ProviderName::Gemini], 0);

    let chat = ChatGenRequest {
        messages: vec![ChatMessage::user("earlier message")],
        content: ContentRequest::new(
            vec!["x".into(), "instagram".into(), "linkedin".into()],
            "three platforms",
        ),
    };
    let routed = router.route_chat(&chat).await.unwrap();
    assert_eq!(routed.provider, ProviderName::Gemini);
    assert_eq!(routed.value.suggestions.len(), 3);
}

#[tokio::test]
async fn image_order_falls_through_to_mock() {
    let router = Setup::new().router(vec![], 1);
    let routed = router.route_image("sunset over mountains").await.unwrap();
    assert_eq!(routed.provider, ProviderName::Mock);
    assert!(routed.value.starts_with("https://"));

    // Same prompt, same placeholder.
    let again = router.route_image("sunset over mountains").await.unwrap();
    assert_eq!(routed.value, again.value);
}
