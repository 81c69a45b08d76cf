//! TemplateDao trait - shareable curation templates

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::models::{CurationTemplate, TemplateDraft};

#[async_trait]
pub trait TemplateDao: Send + Sync {
    async fn insert_template(&self, template: &CurationTemplate) -> Result<()>;

    async fn get_template(&self, template_id: Uuid) -> Result<Option<CurationTemplate>>;

    async fn list_owner_templates(&self, owner_id: Uuid) -> Result<Vec<CurationTemplate>>;

    /// Public templates, most used first.
    async fn list_public_templates(&self, limit: usize) -> Result<Vec<CurationTemplate>>;

    async fn update_template_config(
        &self,
        template_id: Uuid,
        owner_id: Uuid,
        draft: &TemplateDraft,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<CurationTemplate>>;

    async fn delete_template(&self, template_id: Uuid, owner_id: Uuid) -> Result<bool>;

    /// Atomically increments `use_count` and sets `last_used`.
    async fn record_template_use(
        &self,
        template_id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<Option<CurationTemplate>>;
}
