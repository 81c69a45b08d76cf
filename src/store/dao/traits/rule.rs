//! RuleDao trait - persisted curation rules

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::store::models::{CurationRule, RuleDraft};

#[async_trait]
pub trait RuleDao: Send + Sync {
    async fn insert_rule(&self, rule: &CurationRule) -> Result<()>;

    async fn get_rule(&self, rule_id: Uuid) -> Result<Option<CurationRule>>;

    async fn list_rules(&self, owner_id: Uuid) -> Result<Vec<CurationRule>>;

    async fn list_active_rules(&self, owner_id: Uuid) -> Result<Vec<CurationRule>>;

    async fn owners_with_active_rules(&self) -> Result<Vec<Uuid>>;

    /// Replaces the owner-editable columns only; run statistics are never written here.
    /// Returns `None` when no rule with that id belongs to `owner_id`.
    async fn update_rule_config(
        &self,
        rule_id: Uuid,
        owner_id: Uuid,
        draft: &RuleDraft,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<CurationRule>>;

    async fn delete_rule(&self, rule_id: Uuid, owner_id: Uuid) -> Result<bool>;

    /// Atomically sets `last_run`, increments `run_count` by one and
    /// `items_curated` by `items`, returning the updated rule.
    async fn record_rule_run(
        &self,
        rule_id: Uuid,
        ran_at: DateTime<Utc>,
        items: i64,
    ) -> Result<Option<CurationRule>>;

    /// Moves `last_run` from `expected` to `next` only while it still equals
    /// `expected`. Returns `false` when another caller changed it first.
    async fn swap_last_run(
        &self,
        rule_id: Uuid,
        expected: Option<DateTime<Utc>>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool>;

    /// Connectivity check used by readiness.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
