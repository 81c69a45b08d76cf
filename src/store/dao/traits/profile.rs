use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::store::models::OwnerProfile;

#[async_trait]
pub trait ProfileDao: Send + Sync {
    async fn get_profile(&self, owner_id: Uuid) -> Result<Option<OwnerProfile>>;
}
