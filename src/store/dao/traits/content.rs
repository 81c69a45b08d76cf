//! ContentDao trait - read access to the content store

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::store::models::{ContentFilter, ContentItem};

#[async_trait]
pub trait ContentDao: Send + Sync {
    /// Items owned by `owner_id` matching `filter`, in store order, capped at `filter.limit`.
    async fn find_content(&self, owner_id: Uuid, filter: &ContentFilter)
    -> Result<Vec<ContentItem>>;

    /// A single item, only if it belongs to `owner_id`.
    async fn find_content_by_id(
        &self,
        owner_id: Uuid,
        content_id: Uuid,
    ) -> Result<Option<ContentItem>>;

    /// Connectivity check used by readiness.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
