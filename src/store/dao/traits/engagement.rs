//! EngagementDao trait - posted history of content items

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::models::EngagementRecord;

#[async_trait]
pub trait EngagementDao: Send + Sync {
    /// All posted records for the given content ids in one round trip.
    async fn find_by_content_ids(
        &self,
        owner_id: Uuid,
        content_ids: &[Uuid],
    ) -> Result<Vec<EngagementRecord>>;

    async fn find_most_recent_posted(
        &self,
        owner_id: Uuid,
        content_id: Uuid,
    ) -> Result<Option<EngagementRecord>>;

    /// Posted records with `posted_at >= since`.
    async fn find_posted_since(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<EngagementRecord>>;
}
