//! Provider subsystem for generative-AI content backends.
//!
//! Each vendor adapter implements the [`ContentProvider`] trait defined in
//! [`traits`] and is registered under its [`ProviderName`] in the registry
//! built by [`build_registry`]. The [`router::ContentRouter`] drives retry
//! and fallback across registered providers; per-request selection of the
//! active provider lives in [`selector::ActiveSelector`].
//!
//! Credentials are plain environment variables, resolved at call time rather
//! than cached, so a key exported mid-session is picked up by the very next
//! request. A missing credential marks a provider unconfigured; it is never
//! an error by itself.

pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod groq;
pub mod huggingface;
pub mod keypool;
pub mod mock;
pub mod openai;
pub mod registry;
pub mod replicate;
pub mod retry;
pub mod router;
pub mod selector;
pub mod traits;
pub mod unsplash;

#[allow(unused_imports)]
pub use error::{ErrorKind, ProviderError, ProviderResult};
#[allow(unused_imports)]
pub use registry::{ProviderName, ProviderRegistry};
#[allow(unused_imports)]
pub use router::{ContentRouter, Routed};
#[allow(unused_imports)]
pub use traits::{
    ChatGenRequest, ChatMessage, ContentProvider, ContentRequest, GenerationResult,
    PlatformContent, ProviderInfo, StylePrefs,
};

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const MAX_API_ERROR_CHARS: usize = 200;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";
pub const HUGGING_FACE_TOKEN_ENV: &str = "HUGGING_FACE_TOKEN";
pub const REPLICATE_API_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";
pub const UNSPLASH_ACCESS_KEY_ENV: &str = "UNSPLASH_ACCESS_KEY";

/// Read a credential from the environment. Blank values count as unset.
pub fn resolve_credential(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Environment variable backing each credentialed provider.
pub fn credential_env_var(name: ProviderName) -> Option<&'static str> {
    match name {
        ProviderName::Openai => Some(OPENAI_API_KEY_ENV),
        ProviderName::Gemini => Some(GEMINI_API_KEY_ENV),
        ProviderName::Anthropic => Some(ANTHROPIC_API_KEY_ENV),
        ProviderName::Groq => Some(GROQ_API_KEY_ENV),
        ProviderName::Huggingface => Some(HUGGING_FACE_TOKEN_ENV),
        ProviderName::Replicate => Some(REPLICATE_API_TOKEN_ENV),
        ProviderName::Unsplash => Some(UNSPLASH_ACCESS_KEY_ENV),
        ProviderName::Mock => None,
    }
}

/// Shared HTTP client with connect and request timeouts.
pub(crate) fn http_client() -> reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|error| {
                    tracing::warn!("Failed to build timeout client: {error}");
                    reqwest::Client::new()
                })
        })
        .clone()
}

/// Build the full registry of vendor adapters. Every [`ProviderName`] gets an
/// entry whether or not its credential is currently present.
pub fn build_registry() -> ProviderRegistry {
    let mut providers: HashMap<ProviderName, Arc<dyn ContentProvider>> = HashMap::new();
    providers.insert(
        ProviderName::Openai,
        Arc::new(openai::OpenAiProvider::new()),
    );
    providers.insert(
        ProviderName::Gemini,
        Arc::new(gemini::GeminiProvider::new()),
    );
    providers.insert(
        ProviderName::Anthropic,
        Arc::new(anthropic::AnthropicProvider::new()),
    );
    providers.insert(ProviderName::Groq, Arc::new(groq::GroqProvider::new()));
    providers.insert(
        ProviderName::Huggingface,
        Arc::new(huggingface::HuggingFaceProvider::new()),
    );
    providers.insert(
        ProviderName::Replicate,
        Arc::new(replicate::ReplicateProvider::new()),
    );
    providers.insert(
        ProviderName::Unsplash,
        Arc::new(unsplash::UnsplashProvider::new()),
    );
    providers.insert(ProviderName::Mock, Arc::new(mock::MockProvider::new()));
    ProviderRegistry::new(providers)
}

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Scrub known secret-like token prefixes from provider error strings.
///
/// Redacts tokens with prefixes like `sk-`, `gsk_`, `hf_`, `r8_`, `AIza`,
/// and bearer headers or JSON credential fields echoed back by an API.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [(&str, usize); 15] = [
        ("sk-", 1),
        ("gsk_", 1),
        ("hf_", 1),
        ("r8_", 1),
        ("AIza", 1),
        ("sk-ant-", 1),
        ("\"api_key\":\"", 8),
        ("\"access_token\":\"", 8),
        ("\"token\":\"", 8),
        ("\"client_secret\":\"", 8),
        ("api_key=", 8),
        ("access_token=", 8),
        ("client_id=", 8),
        ("Bearer ", 16),
        ("bearer ", 16),
    ];

    let mut scrubbed = input.to_string();

    for (prefix, min_len) in PREFIXES {
        let mut search_from = 0;
        loop {
            let Some(rel) = scrubbed[search_from..].find(prefix) else {
                break;
            };

            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);
            let token_len = end.saturating_sub(content_start);

            // Bare prefixes like "sk-" should not stop future scans.
            if token_len < min_len {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Sanitize API error text by scrubbing secrets and truncating length.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

/// Build a classified provider error from a failed HTTP response.
pub(crate) async fn api_error(provider: &'static str, response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after_header = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read provider error body>".to_string());

    let mut err = ProviderError::from_status(provider, status, &body);
    if let Some(after) = retry_after_header {
        if err.retry_after().is_none() {
            err = err.with_retry_after(after);
        }
    }
    err
}
