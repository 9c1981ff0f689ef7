//! Persistence for generated content.
//!
//! Saves are fire-and-forget from the gateway's point of view: a storage
//! failure is logged and never fails the request that produced the content.

use crate::providers::traits::PlatformContent;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One saved generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedContentRecord {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub user_query: String,
    pub provider: String,
    pub suggestions: Vec<PlatformContent>,
    pub created_at: DateTime<Utc>,
}

impl GeneratedContentRecord {
    pub fn new(
        user_id: Option<String>,
        user_query: impl Into<String>,
        provider: impl Into<String>,
        suggestions: Vec<PlatformContent>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            user_query: user_query.into(),
            provider: provider.into(),
            suggestions,
            created_at: Utc::now(),
        }
    }
}

/// A post the user accepted for a specific platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub platform: String,
    pub content: String,
    pub hashtags: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PostRecord {
    pub fn new(
        user_id: Option<String>,
        platform: impl Into<String>,
        content: impl Into<String>,
        hashtags: Vec<String>,
        image_url: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            platform: platform.into(),
            content: content.into(),
            hashtags,
            image_url,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save_content(&self, record: GeneratedContentRecord) -> Result<()>;
    async fn save_post(&self, record: PostRecord) -> Result<()>;
    async fn recent_content(&self, limit: usize) -> Result<Vec<GeneratedContentRecord>>;
    async fn recent_posts(&self, limit: usize) -> Result<Vec<PostRecord>>;
}

/// In-process store. Contents vanish on restart, which is the intended
/// behavior for demo deployments without a database attached.
#[derive(Default)]
pub struct MemoryStore {
    content: Mutex<Vec<GeneratedContentRecord>>,
    posts: Mutex<Vec<PostRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn save_content(&self, record: GeneratedContentRecord) -> Result<()> {
        self.content.lock().push(record);
        Ok(())
    }

    async fn save_post(&self, record: PostRecord) -> Result<()> {
        self.posts.lock().push(record);
        Ok(())
    }

    async fn recent_content(&self, limit: usize) -> Result<Vec<GeneratedContentRecord>> {
        let content = self.content.lock();
        Ok(content.iter().rev().take(limit).cloned().collect())
    }

    async fn recent_posts(&self, limit: usize) -> Result<Vec<PostRecord>> {
        let posts = self.posts.lock();
        Ok(posts.iter().rev().take(limit).cloned().collect())
    }
}
