use super::error::{ErrorKind, ProviderError, ProviderResult};
use async_trait::async_trait;
use futures_util::future;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Optional style knobs carried by every generation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StylePrefs {
    pub tone: Option<String>,
    pub format: Option<String>,
    pub niche: Option<String>,
    pub include_emojis: Option<bool>,
    pub emoji_pack: Option<String>,
    pub length: Option<String>,
    pub content_style: Option<String>,
    pub emotional_tone: Option<String>,
    pub structure_preference: Option<String>,
}

/// Immutable input for multi-platform content generation.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    pub platforms: Vec<String>,
    pub user_query: String,
    pub style: StylePrefs,
}

impl ContentRequest {
    pub fn new(platforms: Vec<String>, user_query: impl Into<String>) -> Self {
        Self {
            platforms,
            user_query: user_query.into(),
            style: StylePrefs::default(),
        }
    }
}

/// Chat request: prior history plus the content-request fields.
#[derive(Debug, Clone)]
pub struct ChatGenRequest {
    pub messages: Vec<ChatMessage>,
    pub content: ContentRequest,
}

/// One generated card for one platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformContent {
    pub platform: String,
    pub content: String,
    pub hashtags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
}

/// Normalized generation output: a conversational message plus one
/// suggestion per requested platform. Failed platforms carry a placeholder
/// entry instead of being omitted, so the suggestion list always matches
/// the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub message: String,
    pub suggestions: Vec<PlatformContent>,
}

/// Provider descriptor surfaced by the status endpoint. `configured` is
/// re-evaluated from the environment on every call, never cached.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub is_free: bool,
    pub configured: bool,
}

/// Uniform contract over one generative-AI vendor.
///
/// Adapters implement `chat_completion` (the vendor wire call) plus identity
/// methods; the multi-platform orchestration lives in default methods so
/// every vendor gets identical fan-out and degradation behavior.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Canonical provider key used by the registry and selector.
    fn name(&self) -> &'static str;

    /// Human-facing vendor name for status surfaces.
    fn display_name(&self) -> &'static str;

    /// Whether the vendor has a free tier.
    fn is_free(&self) -> bool {
        false
    }

    /// Whether a usable credential currently resolves. Checked per call so a
    /// credential exported mid-session takes effect on the next request.
    fn configured(&self) -> bool;

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name(),
            display_name: self.display_name(),
            is_free: self.is_free(),
            configured: self.configured(),
        }
    }

    /// One completion over the vendor API. The only method a text adapter
    /// must implement.
    async fn chat_completion(&self, messages: &[ChatMessage]) -> ProviderResult<String>;

    /// Generate one content card per requested platform.
    ///
    /// Platforms are independent: a single failing platform call is replaced
    /// by deterministic fallback text while the rest proceed. Only when every
    /// platform fails with a provider-level error does the whole call fail,
    /// so the router can try a sibling provider instead of returning a result
    /// that is placeholders all the way down.
    async fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> ProviderResult<Vec<PlatformContent>> {
        if request.platforms.is_empty() {
            return Err(ProviderError::invalid_input(
                self.name(),
                "no platforms requested",
            ));
        }

        let calls = request.platforms.iter().map(|platform| async move {
            let messages = [
                ChatMessage::system(build_content_system_prompt(&request.style)),
                ChatMessage::user(build_platform_prompt(
                    platform,
                    &request.user_query,
                    &request.style,
                )),
            ];
            self.chat_completion(&messages).await
        });

        let outcomes = future::join_all(calls).await;

        let mut suggestions = Vec::with_capacity(request.platforms.len());
        let mut first_error: Option<ProviderError> = None;
        let mut failed = 0usize;

        for (platform, outcome) in request.platforms.iter().zip(outcomes) {
            match outcome {
                Ok(text) => suggestions.push(parse_platform_payload(platform, &text)),
                Err(err) => {
                    tracing::warn!(
                        provider = self.name(),
                        platform = platform.as_str(),
                        error = %err,
                        "Platform generation failed, substituting fallback content"
                    );
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                    suggestions.push(fallback_content(platform));
                }
            }
        }

        if failed == request.platforms.len() {
            if let Some(err) = first_error {
                if err.kind() != ErrorKind::InvalidInput {
                    return Err(err);
                }
            }
        }

        Ok(suggestions)
    }

    /// Conversational reply plus one suggestion per requested platform. The
    /// two halves run concurrently against the same vendor.
    async fn generate_chat(&self, request: &ChatGenRequest) -> ProviderResult<GenerationResult> {
        let mut messages = Vec::with_capacity(request.messages.len() + 2);
        messages.push(ChatMessage::system(build_chat_system_prompt(
            &request.content,
        )));
        messages.extend(request.messages.iter().cloned());
        messages.push(ChatMessage::user(request.content.user_query.clone()));

        let (message, suggestions) = future::join(
            self.chat_completion(&messages),
            self.generate_content(&request.content),
        )
        .await;

        Ok(GenerationResult {
            message: message?,
            suggestions: suggestions?,
        })
    }

    /// Generate an image URL or data URI for a prompt.
    ///
    /// `Ok(None)` means the vendor has no image capability or nothing to
    /// serve; the router moves to the next provider in its image order.
    async fn generate_image(&self, _prompt: &str) -> ProviderResult<Option<String>> {
        Ok(None)
    }
}

// ── Prompt construction ──────────────────────────────────────────────────

fn platform_guidance(platform: &str) -> &'static str {
    match platform.to_lowercase().as_str() {
        "x" | "twitter" => "Keep it under 280 characters, punchy, conversation-starting.",
        "instagram" => "Write an engaging caption with a strong hook; emojis welcome.",
        "linkedin" => "Professional register, insight-driven, no clickbait.",
        "tiktok" => "High-energy hook in the first line, trend-aware.",
        "facebook" => "Conversational, community-oriented, invites comments.",
        "youtube" => "Write it as a video description with a compelling first sentence.",
        _ => "Match the conventions of the platform.",
    }
}

pub fn build_content_system_prompt(style: &StylePrefs) -> String {
    let mut prompt = String::from(
        "You are a social media content strategist. You write platform-native \
         posts and reply ONLY with a JSON object of the form \
         {\"content\": string, \"hashtags\": [string], \"image_prompt\": string}. \
         No markdown fences, no commentary.",
    );

    let knobs: [(&str, Option<&String>); 7] = [
        ("Tone", style.tone.as_ref()),
        ("Format", style.format.as_ref()),
        ("Niche", style.niche.as_ref()),
        ("Length", style.length.as_ref()),
        ("Content style", style.content_style.as_ref()),
        ("Emotional tone", style.emotional_tone.as_ref()),
        ("Structure", style.structure_preference.as_ref()),
    ];
    for (label, value) in knobs {
        if let Some(value) = value {
            let _ = write!(prompt, " {label}: {value}.");
        }
    }
    match style.include_emojis {
        Some(true) => {
            prompt.push_str(" Use emojis");
            if let Some(pack) = &style.emoji_pack {
                let _ = write!(prompt, " from the {pack} set");
            }
            prompt.push('.');
        }
        Some(false) => prompt.push_str(" Do not use emojis."),
        None => {}
    }

    prompt
}

pub fn build_platform_prompt(platform: &str, user_query: &str, _style: &StylePrefs) -> String {
    format!(
        "Create a {platform} post about: {user_query}\n{guidance}\n\
         Include 3-6 relevant hashtags and a short image_prompt describing a \
         matching visual.",
        guidance = platform_guidance(platform)
    )
}

pub fn build_chat_system_prompt(content: &ContentRequest) -> String {
    format!(
        "You are a friendly social media content assistant helping a creator \
         plan posts for: {}. Answer conversationally in 2-4 sentences. Do not \
         emit JSON here.",
        content.platforms.join(", ")
    )
}

/// Deterministic placeholder for a platform whose generation call failed.
pub fn fallback_content(platform: &str) -> PlatformContent {
    PlatformContent {
        platform: platform.to_string(),
        content: format!(
            "Unable to generate {platform} content due to AI service unavailability. \
             Please try again."
        ),
        hashtags: vec!["#content".into(), "#socialmedia".into()],
        image_prompt: None,
    }
}

#[derive(Deserialize)]
struct PlatformPayload {
    content: String,
    #[serde(default)]
    hashtags: Vec<String>,
    #[serde(default)]
    image_prompt: Option<String>,
}

/// Parse the model's JSON reply for one platform, tolerating code fences and
/// plain-text answers from models that ignore the format instruction.
pub fn parse_platform_payload(platform: &str, raw: &str) -> PlatformContent {
    let trimmed = strip_code_fence(raw);

    if let Ok(payload) = serde_json::from_str::<PlatformPayload>(trimmed) {
        return PlatformContent {
            platform: platform.to_string(),
            content: payload.content,
            hashtags: normalize_hashtags(payload.hashtags),
            image_prompt: payload
                .image_prompt
                .filter(|prompt| !prompt.trim().is_empty()),
        };
    }

    // Plain text: keep the text as content and lift #tags out of it if any.
    let hashtags: Vec<String> = trimmed
        .split_whitespace()
        .filter(|word| word.starts_with('#') && word.len() > 1)
        .map(ToString::to_string)
        .collect();
    PlatformContent {
        platform: platform.to_string(),
        content: trimmed.to_string(),
        hashtags: if hashtags.is_empty() {
            vec!["#content".into(), "#socialmedia".into()]
        } else {
            hashtags
        },
        image_prompt: None,
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn normalize_hashtags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| {
            let tag = tag.trim().to_string();
            if tag.starts_with('#') {
                tag
            } else {
                format!("#{tag}")
            }
        })
        .filter(|tag| tag.len() > 1)
        .collect()
}
