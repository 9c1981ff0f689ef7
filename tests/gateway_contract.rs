//! Contract tests for the HTTP gateway, driven through the axum service
//! without binding a socket. No provider credentials are configured, so all
//! traffic lands on the mock provider; the contract under test is the wire
//! shape, not vendor behavior.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use postforge::gateway::{build_app, AppState};
use postforge::providers::mock::MockProvider;
use postforge::providers::registry::{ProviderName, ProviderRegistry};
use postforge::providers::retry::RetryPolicy;
use postforge::providers::selector::ActiveSelector;
use postforge::providers::traits::ContentProvider;
use postforge::providers::ContentRouter;
use postforge::storage::MemoryStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;

/// Provider that is configured but always down.
struct DownProvider;

#[async_trait::async_trait]
impl ContentProvider for DownProvider {
    fn name(&self) -> &'static str {
        "down"
    }

    fn display_name(&self) -> &'static str {
        "Down"
    }

    fn configured(&self) -> bool {
        true
    }

    async fn chat_completion(
        &self,
        _messages: &[postforge::providers::traits::ChatMessage],
    ) -> postforge::providers::error::ProviderResult<String> {
        Err(postforge::providers::ProviderError::unavailable(
            "down", "outage",
        ))
    }
}

/// Gateway whose only credentialed provider always fails, with no fallbacks.
fn degraded_app() -> axum::Router {
    let mut providers: HashMap<ProviderName, Arc<dyn ContentProvider>> = HashMap::new();
    providers.insert(ProviderName::Groq, Arc::new(DownProvider));
    providers.insert(ProviderName::Mock, Arc::new(MockProvider::new()));
    let router = ContentRouter::new(
        ProviderRegistry::new(providers),
        ActiveSelector::new(vec![ProviderName::Groq], false),
        vec![],
        vec![],
        RetryPolicy::new(0, 50),
    );
    build_app(AppState {
        router: Arc::new(router),
        store: Arc::new(MemoryStore::new()),
    })
}

/// Gateway wired to the mock provider only.
fn app() -> axum::Router {
    let mut providers: HashMap<ProviderName, Arc<dyn ContentProvider>> = HashMap::new();
    providers.insert(ProviderName::Mock, Arc::new(MockProvider::new()));
    let router = ContentRouter::new(
        ProviderRegistry::new(providers),
        ActiveSelector::new(vec![], false),
        vec![],
        vec![ProviderName::Mock],
        RetryPolicy::default(),
    );
    build_app(AppState {
        router: Arc::new(router),
        store: Arc::new(MemoryStore::new()),
    })
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = get_json(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn status_reports_mock_without_credentials() {
    let (status, body) = get_json(app(), "/api/ai-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["provider"], "mock");
    assert_eq!(body["isFree"], true);
    assert_eq!(body["status"], "mock");
}

#[tokio::test]
async fn chat_returns_one_card_per_platform() {
    let (status, body) = post_json(
        app(),
        "/api/ai-chat",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "platforms": ["x", "instagram"],
            "userQuery": "coffee shop opening"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    let suggested = body["suggestedContent"].as_array().unwrap();
    assert_eq!(suggested.len(), 2);
    assert_eq!(suggested[0]["platform"], "x");
    assert_eq!(suggested[1]["platform"], "instagram");
    for card in suggested {
        assert!(card["content"].as_str().is_some_and(|c| !c.is_empty()));
    }
    assert_eq!(body["provider"], "mock");
}

#[tokio::test]
async fn chat_accepts_style_prefs() {
    let (status, _body) = post_json(
        app(),
        "/api/ai-chat",
        json!({
            "messages": [],
            "platforms": ["linkedin"],
            "userQuery": "hiring announcement",
            "stylePrefs": {"tone": "professional", "includeEmojis": false}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn chat_missing_messages_is_400() {
    let (status, body) = post_json(
        app(),
        "/api/ai-chat",
        json!({"platforms": ["x"], "userQuery": "topic"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("messages"));
}

#[tokio::test]
async fn chat_empty_platforms_is_400() {
    let (status, body) = post_json(
        app(),
        "/api/ai-chat",
        json!({"messages": [], "platforms": [], "userQuery": "topic"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("platforms"));
}

#[tokio::test]
async fn chat_blank_user_query_is_400() {
    let (status, body) = post_json(
        app(),
        "/api/ai-chat",
        json!({"messages": [], "platforms": ["x"], "userQuery": "   "}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("userQuery"));
}

#[tokio::test]
async fn image_generation_succeeds_via_mock() {
    let (status, body) = post_json(
        app(),
        "/api/generate-image",
        json!({"prompt": "a latte with heart art"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["imageUrl"].as_str().unwrap().starts_with("https://"));
    assert_eq!(body["prompt"], "a latte with heart art");
}

#[tokio::test]
async fn image_prompt_derived_from_chat_context() {
    let (status, body) = post_json(
        app(),
        "/api/generate-image",
        json!({"userQuery": "bakery launch", "aiResponse": "fresh sourdough every morning"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["prompt"].as_str().unwrap().contains("bakery launch"));
}

#[tokio::test]
async fn image_with_no_inputs_is_400() {
    let (status, body) = post_json(app(), "/api/generate-image", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn chat_degrades_to_200_with_placeholders_when_all_providers_fail() {
    let (status, body) = post_json(
        degraded_app(),
        "/api/ai-chat",
        json!({
            "messages": [],
            "platforms": ["x", "linkedin"],
            "userQuery": "topic"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "none");
    let suggested = body["suggestedContent"].as_array().unwrap();
    assert_eq!(suggested.len(), 2);
    assert!(suggested[0]["content"]
        .as_str()
        .unwrap()
        .contains("Unable to generate"));
}

#[tokio::test]
async fn image_failure_returns_500_envelope() {
    let (status, body) = post_json(
        degraded_app(),
        "/api/generate-image",
        json!({"prompt": "anything"}),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let huge = "x".repeat(70_000);
    let (status, _body) = post_json(
        app(),
        "/api/ai-chat",
        json!({"messages": [], "platforms": ["x"], "userQuery": huge}),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
