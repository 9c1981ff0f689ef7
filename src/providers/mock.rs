//! Built-in mock provider. Needs no credentials and never fails, which
//! makes it the floor of every selection and fallback order: the service
//! stays demo-able with zero keys configured.

use super::error::ProviderResult;
use super::traits::{
    fallback_content, ChatGenRequest, ChatMessage, ContentProvider, ContentRequest,
    GenerationResult, PlatformContent,
};
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const CONTENT_TEMPLATES: &[&str] = &[
    "Here's a thought on {topic}: the best time to start was yesterday, the second best is right now.",
    "Hot take on {topic}: consistency beats intensity every single week.",
    "Three things I learned about {topic} this month. Number two surprised me.",
    "{topic} doesn't have to be complicated. Start small, share what you learn.",
    "Unpopular opinion about {topic}: most advice out there skips the boring fundamentals.",
];

const CHAT_TEMPLATES: &[&str] = &[
    "Great topic! I've drafted platform-ready posts about {topic} below. Want me to adjust the tone?",
    "Here are some ideas for {topic}. Each one is tailored to its platform's format.",
    "I put together a few angles on {topic}. Tell me which direction you like and I'll iterate.",
];

const HASHTAG_POOL: &[&str] = &[
    "#contentcreator",
    "#socialmedia",
    "#marketing",
    "#growth",
    "#creator",
    "#trending",
    "#digital",
    "#community",
];

pub struct MockProvider;

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self
    }

    fn render(templates: &[&str], topic: &str) -> String {
        let mut rng = rand::rng();
        templates
            .choose(&mut rng)
            .unwrap_or(&templates[0])
            .replace("{topic}", topic)
    }

    fn pick_hashtags(topic: &str) -> Vec<String> {
        let mut rng = rand::rng();
        let mut tags: Vec<String> = HASHTAG_POOL
            .sample(&mut rng, 3)
            .map(ToString::to_string)
            .collect();
        let topic_tag: String = topic
            .split_whitespace()
            .next()
            .unwrap_or("content")
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        if topic_tag.len() > 1 {
            tags.insert(0, format!("#{topic_tag}"));
        }
        tags
    }
}

/// Stable placeholder image URL derived from the prompt, so repeated calls
/// for the same prompt render the same picture.
pub fn placeholder_image_url(prompt: &str) -> String {
    let mut hasher = DefaultHasher::new();
    prompt.hash(&mut hasher);
    let seed = hasher.finish() % 1000;
    format!("https://picsum.photos/seed/{seed}/1024/1024")
}

#[async_trait]
impl ContentProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn display_name(&self) -> &'static str {
        "Mock (demo mode)"
    }

    fn is_free(&self) -> bool {
        true
    }

    fn configured(&self) -> bool {
        true
    }

    async fn chat_completion(&self, messages: &[ChatMessage]) -> ProviderResult<String> {
        let topic = messages
            .iter()
            .rev()
            .find(|message| message.role == "user")
            .map(|message| message.content.as_str())
            .unwrap_or("your topic");
        Ok(Self::render(CHAT_TEMPLATES, topic))
    }

    async fn generate_content(
        &self,
        request: &ContentRequest,
    ) -> ProviderResult<Vec<PlatformContent>> {
        if request.platforms.is_empty() {
            return Ok(vec![fallback_content("general")]);
        }
        Ok(request
            .platforms
            .iter()
            .map(|platform| PlatformContent {
                platform: platform.clone(),
                content: Self::render(CONTENT_TEMPLATES, &request.user_query),
                hashtags: Self::pick_hashtags(&request.user_query),
                image_prompt: Some(format!(
                    "A vibrant social media visual about {}",
                    request.user_query
                )),
            })
            .collect())
    }

    async fn generate_chat(&self, request: &ChatGenRequest) -> ProviderResult<GenerationResult> {
        Ok(GenerationResult {
            message: Self::render(CHAT_TEMPLATES, &request.content.user_query),
            suggestions: self.generate_content(&request.content).await?,
        })
    }

    async fn generate_image(&self, prompt: &str) -> ProviderResult<Option<String>> {
        Ok(Some(placeholder_image_url(prompt)))
    }
}
