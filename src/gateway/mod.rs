//! HTTP gateway: the JSON API in front of the content router.
//!
//! Chat requests degrade rather than fail: when every provider is down the
//! endpoint still answers 200 with per-platform placeholder content, because
//! the consumer is an interactive UI that renders whatever it gets. Image
//! generation keeps conventional status codes since its consumer branches on
//! `success`.

use crate::config::Config;
use crate::providers::registry::ProviderName;
use crate::providers::router::ContentRouter;
use crate::providers::selector::ActiveSelector;
use crate::providers::traits::{
    fallback_content, ChatGenRequest, ChatMessage, ContentRequest, PlatformContent, StylePrefs,
};
use crate::storage::{ContentStore, GeneratedContentRecord, MemoryStore};
use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

pub const MAX_BODY_SIZE: usize = 65_536;
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ContentRouter>,
    pub store: Arc<dyn ContentStore>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            router: Arc::new(build_router(config)),
            store: Arc::new(MemoryStore::new()),
        }
    }
}

/// Wire a [`ContentRouter`] from configuration. The USE_MOCK_AI environment
/// flag is honored here as well as in config so either path forces demo mode.
pub fn build_router(config: &Config) -> ContentRouter {
    let registry = crate::providers::build_registry();
    let selector = ActiveSelector::new(
        config.reliability.preference.clone(),
        config.use_mock || crate::config::env_truthy("USE_MOCK_AI"),
    );
    ContentRouter::new(
        registry,
        selector,
        config.reliability.chat_fallbacks.clone(),
        config.reliability.image_order.clone(),
        config.reliability.retry_policy(),
    )
}

/// Start the gateway and serve until the process is stopped.
pub async fn run_gateway(host: &str, port: u16, config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_port = listener.local_addr()?.port();

    let state = AppState::from_config(&config);
    match state.router.active_info() {
        Ok((name, _)) => tracing::info!(provider = name.as_str(), "Active AI provider"),
        Err(error) => tracing::warn!("Provider status unavailable: {error}"),
    }

    tracing::info!("Gateway listening on http://{host}:{actual_port}");
    axum::serve(listener, build_app(state)).await?;
    Ok(())
}

/// Assemble the router. Separated from [`run_gateway`] so tests can drive
/// the service without binding a socket.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/ai-status", get(handle_ai_status))
        .route("/api/ai-chat", post(handle_ai_chat))
        .route("/api/generate-image", post(handle_generate_image))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiChatBody {
    messages: Option<Vec<ChatMessage>>,
    platforms: Option<Vec<String>>,
    user_query: Option<String>,
    #[serde(default)]
    style_prefs: Option<StylePrefsBody>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StylePrefsBody {
    tone: Option<String>,
    format: Option<String>,
    niche: Option<String>,
    include_emojis: Option<bool>,
    emoji_pack: Option<String>,
    length: Option<String>,
    content_style: Option<String>,
    emotional_tone: Option<String>,
    structure_preference: Option<String>,
}

impl From<StylePrefsBody> for StylePrefs {
    fn from(body: StylePrefsBody) -> Self {
        Self {
            tone: body.tone,
            format: body.format,
            niche: body.niche,
            include_emojis: body.include_emojis,
            emoji_pack: body.emoji_pack,
            length: body.length,
            content_style: body.content_style,
            emotional_tone: body.emotional_tone,
            structure_preference: body.structure_preference,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedContent {
    platform: String,
    content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_prompt: Option<String>,
}

impl From<PlatformContent> for SuggestedContent {
    fn from(content: PlatformContent) -> Self {
        Self {
            platform: content.platform,
            content: content.content,
            hashtags: content.hashtags,
            image_prompt: content.image_prompt,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateImageBody {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    user_query: Option<String>,
    #[serde(default)]
    ai_response: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_ai_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.router.active_info() {
        Ok((name, info)) => Json(serde_json::json!({
            "success": true,
            "provider": name.as_str(),
            "name": info.display_name,
            "isFree": info.is_free,
            "status": if name == ProviderName::Mock { "mock" } else { "operational" },
        }))
        .into_response(),
        Err(error) => {
            tracing::error!("Provider status lookup failed: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Unable to determine AI provider status",
                })),
            )
                .into_response()
        }
    }
}

async fn handle_ai_chat(
    State(state): State<AppState>,
    Json(body): Json<AiChatBody>,
) -> impl IntoResponse {
    let Some(messages) = body.messages else {
        return bad_request("messages is required");
    };
    let Some(platforms) = body.platforms.filter(|p| !p.is_empty()) else {
        return bad_request("platforms must be a non-empty array");
    };
    let Some(user_query) = body
        .user_query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
    else {
        return bad_request("userQuery is required");
    };

    let request = ChatGenRequest {
        messages,
        content: ContentRequest {
            platforms: platforms.clone(),
            user_query: user_query.clone(),
            style: body.style_prefs.unwrap_or_default().into(),
        },
    };

    match state.router.route_chat(&request).await {
        Ok(routed) => {
            let provider = routed.provider;
            if routed.fell_back {
                tracing::info!(
                    provider = provider.as_str(),
                    "Chat served by fallback provider"
                );
            }

            let record = GeneratedContentRecord::new(
                body.user_id,
                user_query,
                provider.as_str(),
                routed.value.suggestions.clone(),
            );
            let store = Arc::clone(&state.store);
            tokio::spawn(async move {
                if let Err(error) = store.save_content(record).await {
                    tracing::warn!("Failed to save generated content: {error}");
                }
            });

            let suggested: Vec<SuggestedContent> = routed
                .value
                .suggestions
                .into_iter()
                .map(Into::into)
                .collect();
            Json(serde_json::json!({
                "message": routed.value.message,
                "suggestedContent": suggested,
                "provider": provider.as_str(),
            }))
            .into_response()
        }
        Err(error) => {
            // Interactive clients get a degraded 200 instead of an error page.
            tracing::error!(error = %error, "All providers failed, serving degraded chat response");
            let suggested: Vec<SuggestedContent> = platforms
                .iter()
                .map(|platform| fallback_content(platform).into())
                .collect();
            Json(serde_json::json!({
                "message": "I'm having trouble reaching the AI services right now. \
                            Here are placeholder drafts; please try again in a moment.",
                "suggestedContent": suggested,
                "provider": "none",
            }))
            .into_response()
        }
    }
}

async fn handle_generate_image(
    State(state): State<AppState>,
    Json(body): Json<GenerateImageBody>,
) -> impl IntoResponse {
    let prompt = image_prompt_from(&body);
    let Some(prompt) = prompt else {
        return bad_request("one of prompt, userQuery, or aiResponse is required");
    };

    match state.router.route_image(&prompt).await {
        Ok(routed) => Json(serde_json::json!({
            "success": true,
            "imageUrl": routed.value,
            "prompt": prompt,
            "context": routed.provider.as_str(),
        }))
        .into_response(),
        Err(error) => {
            tracing::error!(error = %error, "Image generation failed across all providers");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "Image generation is currently unavailable",
                })),
            )
                .into_response()
        }
    }
}

/// Effective image prompt: explicit prompt wins, otherwise one is derived
/// from the conversation context.
fn image_prompt_from(body: &GenerateImageBody) -> Option<String> {
    let explicit = body
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    if let Some(prompt) = explicit {
        return Some(prompt.to_string());
    }

    let query = body
        .user_query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());
    let response = body
        .ai_response
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    match (query, response) {
        (None, None) => None,
        (query, response) => {
            let context = [query, response]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(". ");
            Some(format!(
                "A high-quality social media image representing: {context}"
            ))
        }
    }
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}
