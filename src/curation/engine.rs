//! `CurationEngine` exposes every top-level curation operation over the
//! store handles, the discovery pipeline and the auto scheduler.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::auto_schedule::{AutoScheduler, SchedulePlan, default_schedule_time};
use super::clustering::{ClusterOptions, ClusterReport, cluster_content};
use super::discovery::{
    DiscoveryFilters, DiscoveryPipeline, DiscoveryResult, DiscoverySettings, ScoredContent,
};
use super::freshness::{FreshnessReport, assess_freshness};
use super::gaps::{GapReport, analyze_gaps};
use super::insights::{InsightReport, summarize};
use super::prediction::PerformancePrediction;
use super::scoring::{ScoreOptions, ScoreResult};
use super::similarity::{DEFAULT_SIMILARITY_THRESHOLD, SimilarMatch, detect_similar};
use crate::clients::PerformanceAdvisor;
use crate::observability::metrics::Metrics;
use crate::store::dao::Stores;
use crate::store::models::{
    ContentFilter, ContentItem, ContentStatus, ContentType, CurationActions, CurationCriteria,
    CurationSource, DateRange,
};
use crate::util::error::CurationError;

pub const NOTHING_MATCHED: &str = "No content found matching curation criteria";
pub const NOTHING_FOUND: &str = "No content found";
pub const NOTHING_QUALIFIED: &str = "No content meets minimum score requirement";

const DEFAULT_OPTIMIZE_DAYS: u32 = 7;
/// Longest look-back accepted by period-based reports.
pub const MAX_PERIOD_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub discovery: DiscoverySettings,
    /// Platforms targeted when a request names none.
    pub default_platforms: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            discovery: DiscoverySettings::default(),
            default_platforms: vec!["twitter".to_string(), "linkedin".to_string()],
        }
    }
}

/// Result of every discover-then-maybe-schedule operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurationOutcome {
    pub curated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub content: Vec<ScoredContent>,
}

impl CurationOutcome {
    fn empty(message: &str) -> Self {
        Self {
            curated: 0,
            scheduled: None,
            message: Some(message.to_string()),
            content: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoCurateRequest {
    #[serde(default)]
    pub criteria: CurationCriteria,
    #[serde(default)]
    pub actions: CurationActions,
}

fn default_batch_min_score() -> f64 {
    60.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCurateRequest {
    pub content_ids: Vec<Uuid>,
    #[serde(default = "default_batch_min_score")]
    pub min_score: f64,
    #[serde(default)]
    pub auto_schedule: bool,
    #[serde(default)]
    pub schedule_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Score,
    Recency,
    Performance,
}

fn default_feed_limit() -> usize {
    20
}

fn default_feed_min_score() -> f64 {
    70.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedOptions {
    #[serde(default = "default_feed_limit")]
    pub limit: usize,
    #[serde(default = "default_feed_min_score")]
    pub min_score: f64,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub content_types: Vec<ContentType>,
    #[serde(default)]
    pub sort_by: SortBy,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            limit: default_feed_limit(),
            min_score: default_feed_min_score(),
            platforms: Vec::new(),
            content_types: Vec::new(),
            sort_by: SortBy::Score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CuratedFeed {
    pub feed: Vec<ScoredContent>,
    pub total: usize,
    pub filters: FeedOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarReport {
    pub target_content: ContentItem,
    pub similar_content: Vec<SimilarMatch>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub content_ids: Vec<Uuid>,
    #[serde(flatten)]
    pub options: ClusterOptions,
}

fn default_optimize_days() -> u32 {
    DEFAULT_OPTIMIZE_DAYS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeScheduleRequest {
    pub content_ids: Vec<Uuid>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default = "default_optimize_days")]
    pub duration_days: u32,
}

fn require_ids(ids: &[Uuid]) -> Result<()> {
    if ids.is_empty() {
        return Err(CurationError::Validation("content_ids must not be empty".into()).into());
    }
    Ok(())
}

/// Start of a look-back window of `period_days` ending at `now`.
fn period_start(now: DateTime<Utc>, period_days: i64) -> Result<DateTime<Utc>> {
    if !(1..=MAX_PERIOD_DAYS).contains(&period_days) {
        return Err(CurationError::Validation(format!(
            "period must be between 1 and {MAX_PERIOD_DAYS} days, got {period_days}"
        ))
        .into());
    }
    Duration::try_days(period_days)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| CurationError::Validation(format!("period of {period_days} days is out of range")).into())
}

fn sort_by_score(items: &mut [ScoredContent]) {
    items.sort_by(|a, b| b.score.total_score.total_cmp(&a.score.total_score));
}

#[derive(Clone)]
pub struct CurationEngine {
    stores: Stores,
    pipeline: DiscoveryPipeline,
    auto_scheduler: AutoScheduler,
    default_platforms: Vec<String>,
}

impl CurationEngine {
    pub fn new(
        stores: Stores,
        advisor: Arc<dyn PerformanceAdvisor>,
        metrics: Arc<Metrics>,
        settings: EngineSettings,
    ) -> Self {
        let pipeline = DiscoveryPipeline::new(&stores, settings.discovery, Arc::clone(&metrics));
        let auto_scheduler = AutoScheduler::new(Arc::clone(&stores.scheduling), advisor, metrics);
        Self {
            stores,
            pipeline,
            auto_scheduler,
            default_platforms: settings.default_platforms,
        }
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    fn platforms_or_default(&self, candidates: &[&[String]]) -> Vec<String> {
        candidates
            .iter()
            .find(|platforms| !platforms.is_empty())
            .map_or_else(|| self.default_platforms.clone(), |platforms| platforms.to_vec())
    }

    async fn owned_content(&self, owner_id: Uuid, content_id: Uuid) -> Result<ContentItem> {
        self.stores
            .content
            .find_content_by_id(owner_id, content_id)
            .await
            .context("failed to load content item")?
            .ok_or_else(|| CurationError::content_not_found(content_id).into())
    }

    /// Owned items among `ids`, in the order the ids were given.
    async fn owned_contents(&self, owner_id: Uuid, ids: &[Uuid]) -> Result<Vec<ContentItem>> {
        let filter = ContentFilter {
            ids: Some(ids.to_vec()),
            ..ContentFilter::default()
        };
        let found = self
            .stores
            .content
            .find_content(owner_id, &filter)
            .await
            .context("failed to load requested content")?;
        let mut by_id: FxHashMap<Uuid, ContentItem> =
            found.into_iter().map(|item| (item.id, item)).collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// # Errors
    /// `NotFound` when the item is absent or owned by someone else.
    pub async fn score_content(
        &self,
        owner_id: Uuid,
        content_id: Uuid,
        options: ScoreOptions,
    ) -> Result<ScoreResult> {
        let item = self.owned_content(owner_id, content_id).await?;
        let mut scored = self.pipeline.score_items(owner_id, vec![item], options).await?;
        scored
            .pop()
            .map(|entry| entry.score)
            .ok_or_else(|| CurationError::content_not_found(content_id).into())
    }

    pub async fn discover(&self, owner_id: Uuid, filters: &DiscoveryFilters) -> Result<DiscoveryResult> {
        self.pipeline.discover(owner_id, filters).await
    }

    pub async fn auto_curate(&self, owner_id: Uuid, request: &AutoCurateRequest) -> Result<CurationOutcome> {
        self.run_configured(owner_id, &request.criteria, &request.actions, None)
            .await
    }

    /// Discovery with `criteria` capped at `actions.max_items`, then optional
    /// explicit-date scheduling. Shared by auto-curate, rules and templates.
    ///
    /// # Errors
    /// Propagates discovery and scheduling store failures.
    pub async fn run_configured(
        &self,
        owner_id: Uuid,
        criteria: &CurationCriteria,
        actions: &CurationActions,
        source: Option<CurationSource>,
    ) -> Result<CurationOutcome> {
        let limit = usize::try_from(actions.max_items).unwrap_or(usize::MAX);
        let filters = DiscoveryFilters::from_criteria(criteria, limit);
        let discovered = self.pipeline.discover(owner_id, &filters).await?;
        if discovered.content.is_empty() {
            return Ok(CurationOutcome::empty(NOTHING_MATCHED));
        }

        let scheduled = if actions.auto_schedule {
            let platforms = self.platforms_or_default(&[&actions.platforms, &criteria.platforms]);
            let at = actions
                .schedule_date
                .unwrap_or_else(|| default_schedule_time(Utc::now()));
            let items: Vec<&ContentItem> = discovered.content.iter().map(|entry| &entry.content).collect();
            Some(
                self.auto_scheduler
                    .schedule_at(owner_id, &items, &platforms, at, source)
                    .await?,
            )
        } else {
            None
        };

        Ok(CurationOutcome {
            curated: discovered.content.len(),
            scheduled,
            message: None,
            content: discovered.content,
        })
    }

    /// Scores exactly the given owned items and keeps those at or above
    /// `min_score`, best first.
    ///
    /// # Errors
    /// `Validation` when no ids are given.
    pub async fn batch_curate(&self, owner_id: Uuid, request: &BatchCurateRequest) -> Result<CurationOutcome> {
        require_ids(&request.content_ids)?;
        let items = self.owned_contents(owner_id, &request.content_ids).await?;
        if items.is_empty() {
            return Ok(CurationOutcome::empty(NOTHING_FOUND));
        }

        let mut qualified = self
            .pipeline
            .score_items(owner_id, items, ScoreOptions::default())
            .await?;
        qualified.retain(|entry| entry.score.total_score >= request.min_score);
        if qualified.is_empty() {
            return Ok(CurationOutcome::empty(NOTHING_QUALIFIED));
        }
        sort_by_score(&mut qualified);

        let scheduled = if request.auto_schedule {
            let platforms = self.platforms_or_default(&[&request.platforms]);
            let at = request
                .schedule_date
                .unwrap_or_else(|| default_schedule_time(Utc::now()));
            let items: Vec<&ContentItem> = qualified.iter().map(|entry| &entry.content).collect();
            Some(
                self.auto_scheduler
                    .schedule_at(owner_id, &items, &platforms, at, None)
                    .await?,
            )
        } else {
            None
        };

        info!(
            owner_id = %owner_id,
            requested = request.content_ids.len(),
            curated = qualified.len(),
            "batch curation completed"
        );
        Ok(CurationOutcome {
            curated: qualified.len(),
            scheduled,
            message: None,
            content: qualified,
        })
    }

    pub async fn curated_feed(&self, owner_id: Uuid, options: FeedOptions) -> Result<CuratedFeed> {
        let filters = DiscoveryFilters {
            limit: options.limit,
            min_score: options.min_score,
            platforms: options.platforms.clone(),
            content_types: options.content_types.clone(),
            ..DiscoveryFilters::default()
        };
        let mut feed = self.pipeline.discover(owner_id, &filters).await?.content;
        match options.sort_by {
            SortBy::Score => sort_by_score(&mut feed),
            SortBy::Recency => feed.sort_by(|a, b| b.content.created_at.cmp(&a.content.created_at)),
            SortBy::Performance => feed.sort_by(|a, b| {
                b.score
                    .factors
                    .performance
                    .total_cmp(&a.score.factors.performance)
            }),
        }
        Ok(CuratedFeed {
            total: feed.len(),
            feed,
            filters: options,
        })
    }

    /// # Errors
    /// `NotFound` when the target item is absent or not owned.
    pub async fn detect_similar(
        &self,
        owner_id: Uuid,
        content_id: Uuid,
        threshold: Option<f64>,
    ) -> Result<SimilarReport> {
        let target = self.owned_content(owner_id, content_id).await?;
        let filter = ContentFilter {
            exclude_ids: vec![content_id],
            statuses: vec![
                ContentStatus::Completed,
                ContentStatus::Draft,
                ContentStatus::Published,
            ],
            ..ContentFilter::default()
        };
        let candidates = self
            .stores
            .content
            .find_content(owner_id, &filter)
            .await
            .context("failed to load similarity candidates")?;

        let similar = detect_similar(
            &target,
            candidates,
            threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD),
        );
        debug!(owner_id = %owner_id, content_id = %content_id, matches = similar.len(), "similarity scan completed");
        Ok(SimilarReport {
            count: similar.len(),
            similar_content: similar,
            target_content: target,
        })
    }

    /// # Errors
    /// `Validation` when no ids are given.
    pub async fn cluster(&self, owner_id: Uuid, request: &ClusterRequest) -> Result<ClusterReport> {
        require_ids(&request.content_ids)?;
        let items = self.owned_contents(owner_id, &request.content_ids).await?;
        if items.is_empty() {
            return Ok(ClusterReport::default());
        }
        let scored = self
            .pipeline
            .score_items(owner_id, items.clone(), ScoreOptions::default())
            .await?;
        let scores: FxHashMap<Uuid, f64> = scored
            .iter()
            .map(|entry| (entry.content.id, entry.score.total_score))
            .collect();

        Ok(cluster_content(&items, &request.options, |item| {
            scores.get(&item.id).copied().unwrap_or(0.0)
        }))
    }

    /// # Errors
    /// `NotFound` when the item is absent or not owned.
    pub async fn assess_freshness(&self, owner_id: Uuid, content_id: Uuid) -> Result<FreshnessReport> {
        let item = self.owned_content(owner_id, content_id).await?;
        let last_post = self
            .stores
            .engagement
            .find_most_recent_posted(owner_id, content_id)
            .await
            .context("failed to load last posted record")?;
        Ok(assess_freshness(&item, last_post.as_ref(), Utc::now()))
    }

    /// Curation score plus an engagement forecast from the item's posting history.
    ///
    /// # Errors
    /// `NotFound` when the item is absent or not owned.
    pub async fn predict_performance(&self, owner_id: Uuid, content_id: Uuid) -> Result<PerformancePrediction> {
        let score = self
            .score_content(owner_id, content_id, ScoreOptions::default())
            .await?;
        let history = self
            .stores
            .engagement
            .find_by_content_ids(owner_id, &[content_id])
            .await
            .context("failed to load engagement history")?;
        debug!(%owner_id, %content_id, posts = history.len(), "predicting curation performance");
        Ok(PerformancePrediction::new(content_id, &score, &history))
    }

    /// # Errors
    /// `Validation` when `period_days` is outside `1..=MAX_PERIOD_DAYS`.
    pub async fn analyze_gaps(&self, owner_id: Uuid, period_days: i64) -> Result<GapReport> {
        let since = period_start(Utc::now(), period_days)?;
        let items = self.created_since(owner_id, since).await?;
        let (posted, profile) = tokio::try_join!(
            async {
                self.stores
                    .engagement
                    .find_posted_since(owner_id, since)
                    .await
                    .context("failed to load posted history")
            },
            async {
                self.stores
                    .profiles
                    .get_profile(owner_id)
                    .await
                    .context("failed to fetch owner profile")
            },
        )?;
        Ok(analyze_gaps(&items, &posted, profile.as_ref(), period_days))
    }

    /// Plans, without persisting, a posting window for the given items.
    ///
    /// # Errors
    /// `Validation` when no ids are given.
    pub async fn optimize_schedule(
        &self,
        owner_id: Uuid,
        request: &OptimizeScheduleRequest,
    ) -> Result<SchedulePlan> {
        require_ids(&request.content_ids)?;
        let items = self.owned_contents(owner_id, &request.content_ids).await?;
        let mut scored = self
            .pipeline
            .score_items(owner_id, items, ScoreOptions::default())
            .await?;
        sort_by_score(&mut scored);
        let ranked: Vec<(ContentItem, f64)> = scored
            .into_iter()
            .map(|entry| (entry.content, entry.score.total_score))
            .collect();

        let platforms = self.platforms_or_default(&[&request.platforms]);
        let start = request.start_date.unwrap_or_else(Utc::now);
        Ok(self
            .auto_scheduler
            .plan_window(owner_id, &ranked, &platforms, start, request.duration_days)
            .await)
    }

    /// # Errors
    /// `Validation` when `period_days` is outside `1..=MAX_PERIOD_DAYS`.
    pub async fn insights(&self, owner_id: Uuid, period_days: i64) -> Result<InsightReport> {
        let since = period_start(Utc::now(), period_days)?;
        let items = self.created_since(owner_id, since).await?;
        let scored = self
            .pipeline
            .score_items(owner_id, items, ScoreOptions::default())
            .await?;
        Ok(summarize(&scored))
    }

    async fn created_since(&self, owner_id: Uuid, since: DateTime<Utc>) -> Result<Vec<ContentItem>> {
        let filter = ContentFilter {
            created_range: Some(DateRange {
                start: Some(since),
                end: None,
            }),
            ..ContentFilter::default()
        };
        self.stores
            .content
            .find_content(owner_id, &filter)
            .await
            .context("failed to load content for period")
    }
}
