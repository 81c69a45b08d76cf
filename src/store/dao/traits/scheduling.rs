use anyhow::Result;
use async_trait::async_trait;

use crate::store::models::ScheduledPostRecord;

#[async_trait]
pub trait SchedulingDao: Send + Sync {
    /// Writes all records or none.
    async fn insert_scheduled_posts(&self, records: &[ScheduledPostRecord]) -> Result<()>;
}
