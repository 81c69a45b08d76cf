//! In-memory store backing tests, benches and local runs without Postgres.
use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::traits::{ContentDao, EngagementDao, ProfileDao, RuleDao, SchedulingDao, TemplateDao};
use crate::store::models::{
    ContentFilter, ContentItem, CurationRule, CurationTemplate, EngagementRecord, OwnerProfile,
    RuleDraft, ScheduledPostRecord, TemplateDraft,
};

#[derive(Debug, Default)]
struct State {
    content: Vec<ContentItem>,
    engagement: Vec<(Uuid, EngagementRecord)>,
    profiles: HashMap<Uuid, OwnerProfile>,
    scheduled: Vec<ScheduledPostRecord>,
    rules: Vec<CurationRule>,
    templates: Vec<CurationTemplate>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_content(&self, item: ContentItem) {
        self.state.write().await.content.push(item);
    }

    pub async fn insert_engagement(&self, owner_id: Uuid, record: EngagementRecord) {
        self.state.write().await.engagement.push((owner_id, record));
    }

    pub async fn upsert_profile(&self, profile: OwnerProfile) {
        self.state
            .write()
            .await
            .profiles
            .insert(profile.owner_id, profile);
    }

    pub async fn scheduled_posts(&self) -> Vec<ScheduledPostRecord> {
        self.state.read().await.scheduled.clone()
    }
}

#[async_trait]
impl ContentDao for InMemoryStore {
    async fn find_content(
        &self,
        owner_id: Uuid,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>> {
        let state = self.state.read().await;
        let matching = state
            .content
            .iter()
            .filter(|item| item.owner_id == owner_id && filter.matches(item))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matching)
    }

    async fn find_content_by_id(
        &self,
        owner_id: Uuid,
        content_id: Uuid,
    ) -> Result<Option<ContentItem>> {
        let state = self.state.read().await;
        Ok(state
            .content
            .iter()
            .find(|item| item.id == content_id && item.owner_id == owner_id)
            .cloned())
    }
}

#[async_trait]
impl EngagementDao for InMemoryStore {
    async fn find_by_content_ids(
        &self,
        owner_id: Uuid,
        content_ids: &[Uuid],
    ) -> Result<Vec<EngagementRecord>> {
        let state = self.state.read().await;
        Ok(state
            .engagement
            .iter()
            .filter(|(owner, record)| *owner == owner_id && content_ids.contains(&record.content_id))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn find_most_recent_posted(
        &self,
        owner_id: Uuid,
        content_id: Uuid,
    ) -> Result<Option<EngagementRecord>> {
        let state = self.state.read().await;
        Ok(state
            .engagement
            .iter()
            .filter(|(owner, record)| *owner == owner_id && record.content_id == content_id)
            .map(|(_, record)| record)
            .max_by_key(|record| record.posted_at)
            .cloned())
    }

    async fn find_posted_since(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<EngagementRecord>> {
        let state = self.state.read().await;
        Ok(state
            .engagement
            .iter()
            .filter(|(owner, record)| *owner == owner_id && record.posted_at >= since)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

#[async_trait]
impl ProfileDao for InMemoryStore {
    async fn get_profile(&self, owner_id: Uuid) -> Result<Option<OwnerProfile>> {
        Ok(self.state.read().await.profiles.get(&owner_id).cloned())
    }
}

#[async_trait]
impl SchedulingDao for InMemoryStore {
    async fn insert_scheduled_posts(&self, records: &[ScheduledPostRecord]) -> Result<()> {
        self.state
            .write()
            .await
            .scheduled
            .extend_from_slice(records);
        Ok(())
    }
}

#[async_trait]
impl RuleDao for InMemoryStore {
    async fn insert_rule(&self, rule: &CurationRule) -> Result<()> {
        self.state.write().await.rules.push(rule.clone());
        Ok(())
    }

    async fn get_rule(&self, rule_id: Uuid) -> Result<Option<CurationRule>> {
        let state = self.state.read().await;
        Ok(state.rules.iter().find(|rule| rule.id == rule_id).cloned())
    }

    async fn list_rules(&self, owner_id: Uuid) -> Result<Vec<CurationRule>> {
        let state = self.state.read().await;
        Ok(state
            .rules
            .iter()
            .filter(|rule| rule.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_active_rules(&self, owner_id: Uuid) -> Result<Vec<CurationRule>> {
        let state = self.state.read().await;
        Ok(state
            .rules
            .iter()
            .filter(|rule| rule.owner_id == owner_id && rule.is_active)
            .cloned()
            .collect())
    }

    async fn owners_with_active_rules(&self) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        let mut owners: Vec<Uuid> = state
            .rules
            .iter()
            .filter(|rule| rule.is_active)
            .map(|rule| rule.owner_id)
            .collect();
        owners.sort_unstable();
        owners.dedup();
        Ok(owners)
    }

    async fn update_rule_config(
        &self,
        rule_id: Uuid,
        owner_id: Uuid,
        draft: &RuleDraft,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<CurationRule>> {
        let mut state = self.state.write().await;
        let Some(rule) = state
            .rules
            .iter_mut()
            .find(|rule| rule.id == rule_id && rule.owner_id == owner_id)
        else {
            return Ok(None);
        };
        rule.name.clone_from(&draft.name);
        rule.is_active = draft.is_active;
        rule.criteria = draft.criteria.clone();
        rule.actions = draft.actions.clone();
        rule.updated_at = updated_at;
        Ok(Some(rule.clone()))
    }

    async fn delete_rule(&self, rule_id: Uuid, owner_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.rules.len();
        state
            .rules
            .retain(|rule| !(rule.id == rule_id && rule.owner_id == owner_id));
        Ok(state.rules.len() != before)
    }

    async fn record_rule_run(
        &self,
        rule_id: Uuid,
        ran_at: DateTime<Utc>,
        items: i64,
    ) -> Result<Option<CurationRule>> {
        let mut state = self.state.write().await;
        let Some(rule) = state.rules.iter_mut().find(|rule| rule.id == rule_id) else {
            return Ok(None);
        };
        rule.last_run = Some(ran_at);
        rule.run_count += 1;
        rule.items_curated += items;
        Ok(Some(rule.clone()))
    }

    async fn swap_last_run(
        &self,
        rule_id: Uuid,
        expected: Option<DateTime<Utc>>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.rules.iter_mut().find(|rule| rule.id == rule_id) {
            Some(rule) if rule.last_run == expected => {
                rule.last_run = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TemplateDao for InMemoryStore {
    async fn insert_template(&self, template: &CurationTemplate) -> Result<()> {
        self.state.write().await.templates.push(template.clone());
        Ok(())
    }

    async fn get_template(&self, template_id: Uuid) -> Result<Option<CurationTemplate>> {
        let state = self.state.read().await;
        Ok(state
            .templates
            .iter()
            .find(|template| template.id == template_id)
            .cloned())
    }

    async fn list_owner_templates(&self, owner_id: Uuid) -> Result<Vec<CurationTemplate>> {
        let state = self.state.read().await;
        Ok(state
            .templates
            .iter()
            .filter(|template| template.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn list_public_templates(&self, limit: usize) -> Result<Vec<CurationTemplate>> {
        let state = self.state.read().await;
        let mut public: Vec<CurationTemplate> = state
            .templates
            .iter()
            .filter(|template| template.is_public)
            .cloned()
            .collect();
        public.sort_by(|a, b| b.use_count.cmp(&a.use_count));
        public.truncate(limit);
        Ok(public)
    }

    async fn update_template_config(
        &self,
        template_id: Uuid,
        owner_id: Uuid,
        draft: &TemplateDraft,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<CurationTemplate>> {
        let mut state = self.state.write().await;
        let Some(template) = state
            .templates
            .iter_mut()
            .find(|template| template.id == template_id && template.owner_id == owner_id)
        else {
            return Ok(None);
        };
        template.name.clone_from(&draft.name);
        template.description.clone_from(&draft.description);
        template.is_public = draft.is_public;
        template.criteria = draft.criteria.clone();
        template.actions = draft.actions.clone();
        template.updated_at = updated_at;
        Ok(Some(template.clone()))
    }

    async fn delete_template(&self, template_id: Uuid, owner_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.templates.len();
        state
            .templates
            .retain(|template| !(template.id == template_id && template.owner_id == owner_id));
        Ok(state.templates.len() != before)
    }

    async fn record_template_use(
        &self,
        template_id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<Option<CurationTemplate>> {
        let mut state = self.state.write().await;
        let Some(template) = state
            .templates
            .iter_mut()
            .find(|template| template.id == template_id)
        else {
            return Ok(None);
        };
        template.use_count += 1;
        template.last_used = Some(used_at);
        Ok(Some(template.clone()))
    }
}
