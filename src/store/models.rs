use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::error::CurationError;

/// Kind of a stored content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Article,
    Podcast,
    Script,
    Quote,
    Image,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Article => "article",
            ContentType::Podcast => "podcast",
            ContentType::Script => "script",
            ContentType::Quote => "quote",
            ContentType::Image => "image",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "video" => Some(ContentType::Video),
            "article" => Some(ContentType::Article),
            "podcast" => Some(ContentType::Podcast),
            "script" => Some(ContentType::Script),
            "quote" => Some(ContentType::Quote),
            "image" => Some(ContentType::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Completed,
    Published,
    Archived,
}

impl ContentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Completed => "completed",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(ContentStatus::Draft),
            "completed" => Some(ContentStatus::Completed),
            "published" => Some(ContentStatus::Published),
            "archived" => Some(ContentStatus::Archived),
            _ => None,
        }
    }
}

/// Content record owned by the content store. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub content_type: ContentType,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub has_media: bool,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
}

/// One posted occurrence of a content item, derived from historical scheduled posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub content_id: Uuid,
    pub platform: String,
    pub engagement: f64,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub owner_id: Uuid,
    pub niche: Option<String>,
    #[serde(default)]
    pub preference_tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }
}

/// Recurrence of a curation rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleInterval {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleInterval {
    /// Minimum elapsed hours between two runs. `None` for one-shot rules.
    #[must_use]
    pub fn min_hours(self) -> Option<i64> {
        match self {
            ScheduleInterval::None => None,
            ScheduleInterval::Daily => Some(24),
            ScheduleInterval::Weekly => Some(168),
            ScheduleInterval::Monthly => Some(720),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleInterval::None => "none",
            ScheduleInterval::Daily => "daily",
            ScheduleInterval::Weekly => "weekly",
            ScheduleInterval::Monthly => "monthly",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "none" => Some(ScheduleInterval::None),
            "daily" => Some(ScheduleInterval::Daily),
            "weekly" => Some(ScheduleInterval::Weekly),
            "monthly" => Some(ScheduleInterval::Monthly),
            _ => None,
        }
    }
}

fn default_min_score() -> f64 {
    70.0
}

fn default_max_items() -> u32 {
    10
}

/// What content a rule or template selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationCriteria {
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub content_types: Vec<ContentType>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl Default for CurationCriteria {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            platforms: Vec::new(),
            content_types: Vec::new(),
            tags: Vec::new(),
            exclude_tags: Vec::new(),
            date_range: None,
        }
    }
}

/// What a rule or template does with the selected content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationActions {
    #[serde(default)]
    pub auto_schedule: bool,
    #[serde(default)]
    pub schedule_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub schedule_interval: ScheduleInterval,
    #[serde(default = "default_max_items")]
    pub max_items: u32,
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl Default for CurationActions {
    fn default() -> Self {
        Self {
            auto_schedule: false,
            schedule_date: None,
            schedule_interval: ScheduleInterval::None,
            max_items: default_max_items(),
            platforms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationRule {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub criteria: CurationCriteria,
    pub actions: CurationActions,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: i64,
    pub items_curated: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurationTemplate {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub criteria: CurationCriteria,
    pub actions: CurationActions,
    pub use_count: i64,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CurationTemplate {
    #[must_use]
    pub fn is_visible_to(&self, viewer: Uuid) -> bool {
        self.is_public || self.owner_id == viewer
    }
}

/// Scheduled-post stub written to the scheduling store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPostRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub content_id: Uuid,
    pub platform: String,
    pub scheduled_time: DateTime<Utc>,
    pub status: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content_type: ContentType,
    pub curation_source: Option<CurationSource>,
}

/// Which configuration produced a scheduled post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum CurationSource {
    Rule(Uuid),
    Template(Uuid),
}

/// Query over the content store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFilter {
    pub ids: Option<Vec<Uuid>>,
    pub exclude_ids: Vec<Uuid>,
    pub statuses: Vec<ContentStatus>,
    pub content_types: Vec<ContentType>,
    pub tags: Vec<String>,
    /// Items carrying any of these tags are dropped, compared case-insensitively.
    pub exclude_tags: Vec<String>,
    pub created_range: Option<DateRange>,
    pub limit: Option<usize>,
}

impl ContentFilter {
    fn excludes_tags_of(&self, item: &ContentItem) -> bool {
        !self.exclude_tags.is_empty()
            && item.tags.iter().any(|tag| {
                self.exclude_tags
                    .iter()
                    .any(|blocked| blocked.to_lowercase() == tag.to_lowercase())
            })
    }

    /// In-process evaluation of the filter, excluding `limit`.
    #[must_use]
    pub fn matches(&self, item: &ContentItem) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&item.id) {
                return false;
            }
        }
        if self.exclude_ids.contains(&item.id) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&item.status) {
            return false;
        }
        if !self.content_types.is_empty() && !self.content_types.contains(&item.content_type) {
            return false;
        }
        if !self.tags.is_empty() && !item.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        if self.excludes_tags_of(item) {
            return false;
        }
        self.created_range
            .is_none_or(|range| range.contains(item.created_at))
    }
}

/// Input for creating or replacing a rule's owner-editable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDraft {
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub criteria: CurationCriteria,
    #[serde(default)]
    pub actions: CurationActions,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub criteria: CurationCriteria,
    #[serde(default)]
    pub actions: CurationActions,
}

/// Bounds shared by rules and templates: `min_score` in 0..=100, `max_items` in 1..=100.
///
/// # Errors
/// Returns [`CurationError::Validation`] naming the first offending field.
pub fn validate_config(
    name: &str,
    criteria: &CurationCriteria,
    actions: &CurationActions,
) -> Result<(), CurationError> {
    if name.trim().is_empty() {
        return Err(CurationError::Validation("name must not be empty".into()));
    }
    if !(0.0..=100.0).contains(&criteria.min_score) {
        return Err(CurationError::Validation(format!(
            "criteria.min_score must be between 0 and 100, got {}",
            criteria.min_score
        )));
    }
    if !(1..=100).contains(&actions.max_items) {
        return Err(CurationError::Validation(format!(
            "actions.max_items must be between 1 and 100, got {}",
            actions.max_items
        )));
    }
    Ok(())
}

impl RuleDraft {
    /// # Errors
    /// See [`validate_config`].
    pub fn validate(&self) -> Result<(), CurationError> {
        validate_config(&self.name, &self.criteria, &self.actions)
    }
}

impl TemplateDraft {
    /// # Errors
    /// See [`validate_config`].
    pub fn validate(&self) -> Result<(), CurationError> {
        validate_config(&self.name, &self.criteria, &self.actions)
    }
}
