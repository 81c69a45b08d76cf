//! Candidate fetch, batched enrichment, scoring and ranking.
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use futures::{StreamExt, TryStreamExt, stream};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::scoring::{ScoreOptions, ScoreResult, score_content};
use crate::observability::metrics::Metrics;
use crate::store::dao::{ContentDao, EngagementDao, ProfileDao, Stores};
use crate::store::models::{
    ContentFilter, ContentItem, ContentStatus, ContentType, CurationCriteria, DateRange,
    EngagementRecord,
};

/// Candidates fetched per requested result.
const OVERFETCH_FACTOR: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoverySettings {
    /// Engagement batches in flight at once.
    pub fetch_concurrency: usize,
    /// Content ids per engagement query.
    pub engagement_batch_size: usize,
    /// Candidate count from which scoring runs on the rayon pool.
    pub parallel_scoring_threshold: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            fetch_concurrency: 4,
            engagement_batch_size: 200,
            parallel_scoring_threshold: 64,
        }
    }
}

fn default_limit() -> usize {
    20
}

fn default_min_score() -> f64 {
    60.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryFilters {
    #[serde(default = "default_limit")]
    pub limit: usize,
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
    #[serde(default)]
    pub exclude_ids: Vec<Uuid>,
}

impl Default for DiscoveryFilters {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            min_score: default_min_score(),
            platforms: Vec::new(),
            content_types: Vec::new(),
            tags: Vec::new(),
            exclude_tags: Vec::new(),
            date_range: None,
            exclude_ids: Vec::new(),
        }
    }
}

impl DiscoveryFilters {
    /// Filters equivalent to a stored rule or template configuration.
    #[must_use]
    pub fn from_criteria(criteria: &CurationCriteria, limit: usize) -> Self {
        Self {
            limit,
            min_score: criteria.min_score,
            platforms: criteria.platforms.clone(),
            content_types: criteria.content_types.clone(),
            tags: criteria.tags.clone(),
            exclude_tags: criteria.exclude_tags.clone(),
            date_range: criteria.date_range,
            exclude_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredContent {
    pub content: ContentItem,
    pub score: ScoreResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryResult {
    pub discovered: usize,
    pub total_scored: usize,
    pub content: Vec<ScoredContent>,
}

#[derive(Clone)]
pub struct DiscoveryPipeline {
    content: Arc<dyn ContentDao>,
    engagement: Arc<dyn EngagementDao>,
    profiles: Arc<dyn ProfileDao>,
    settings: DiscoverySettings,
    metrics: Arc<Metrics>,
}

impl DiscoveryPipeline {
    pub fn new(stores: &Stores, settings: DiscoverySettings, metrics: Arc<Metrics>) -> Self {
        Self {
            content: Arc::clone(&stores.content),
            engagement: Arc::clone(&stores.engagement),
            profiles: Arc::clone(&stores.profiles),
            settings,
            metrics,
        }
    }

    /// Fetches up to `3 × limit` candidates, scores them, keeps those at or
    /// above `min_score` and returns at most `limit`, best first.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn discover(&self, owner_id: Uuid, filters: &DiscoveryFilters) -> Result<DiscoveryResult> {
        let started = Instant::now();

        let query = ContentFilter {
            ids: None,
            exclude_ids: filters.exclude_ids.clone(),
            statuses: vec![ContentStatus::Completed, ContentStatus::Draft],
            content_types: filters.content_types.clone(),
            tags: filters.tags.clone(),
            exclude_tags: filters.exclude_tags.clone(),
            created_range: filters.date_range,
            limit: Some(filters.limit.saturating_mul(OVERFETCH_FACTOR)),
        };
        let candidates = self
            .content
            .find_content(owner_id, &query)
            .await
            .context("failed to fetch curation candidates")?;

        let mut scored = self
            .score_items(owner_id, candidates, ScoreOptions::default())
            .await?;
        let total_scored = scored.len();

        scored.retain(|entry| entry.score.total_score >= filters.min_score);
        scored.sort_by(|a, b| b.score.total_score.total_cmp(&a.score.total_score));
        scored.truncate(filters.limit);

        self.metrics.discovery_runs.inc();
        self.metrics
            .discovery_duration
            .observe(started.elapsed().as_secs_f64());
        debug!(
            owner_id = %owner_id,
            total_scored,
            discovered = scored.len(),
            min_score = filters.min_score,
            "discovery completed"
        );

        Ok(DiscoveryResult {
            discovered: scored.len(),
            total_scored,
            content: scored,
        })
    }

    /// Scores `items` in their given order with one profile lookup and batched
    /// engagement queries.
    ///
    /// # Errors
    /// Propagates store failures.
    pub async fn score_items(
        &self,
        owner_id: Uuid,
        items: Vec<ContentItem>,
        options: ScoreOptions,
    ) -> Result<Vec<ScoredContent>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        let profile_lookup = async {
            if options.consider_relevance {
                self.profiles
                    .get_profile(owner_id)
                    .await
                    .context("failed to fetch owner profile")
            } else {
                Ok(None)
            }
        };
        let history_lookup = async {
            if options.consider_performance {
                self.fetch_history(owner_id, &ids).await
            } else {
                Ok(FxHashMap::default())
            }
        };
        let (profile, history) = tokio::try_join!(profile_lookup, history_lookup)?;

        let now = Utc::now();
        let parallel = items.len() >= self.settings.parallel_scoring_threshold;
        let score_all = move || {
            let score_one = |item: &ContentItem| {
                let records = history.get(&item.id).map_or(&[][..], Vec::as_slice);
                score_content(item, records, profile.as_ref(), &options, now)
            };
            let scores: Vec<ScoreResult> = if parallel {
                items.par_iter().map(&score_one).collect()
            } else {
                items.iter().map(&score_one).collect()
            };
            items
                .into_iter()
                .zip(scores)
                .map(|(content, score)| ScoredContent { content, score })
                .collect::<Vec<_>>()
        };

        let scored = if parallel {
            tokio::task::spawn_blocking(score_all)
                .await
                .context("scoring task panicked")?
        } else {
            score_all()
        };
        self.metrics.items_scored.inc_by(scored.len() as f64);
        Ok(scored)
    }

    async fn fetch_history(
        &self,
        owner_id: Uuid,
        ids: &[Uuid],
    ) -> Result<FxHashMap<Uuid, Vec<EngagementRecord>>> {
        let batch_size = self.settings.engagement_batch_size.max(1);
        let chunks: Vec<Vec<Uuid>> = ids.chunks(batch_size).map(<[Uuid]>::to_vec).collect();
        let engagement = Arc::clone(&self.engagement);
        let batches: Vec<Vec<EngagementRecord>> = stream::iter(chunks)
            .map(move |chunk| {
                let engagement = Arc::clone(&engagement);
                async move { engagement.find_by_content_ids(owner_id, &chunk).await }
            })
            .buffer_unordered(self.settings.fetch_concurrency.max(1))
            .try_collect()
            .await
            .context("failed to batch-fetch engagement history")?;

        let mut by_content: FxHashMap<Uuid, Vec<EngagementRecord>> = FxHashMap::default();
        for record in batches.into_iter().flatten() {
            by_content.entry(record.content_id).or_default().push(record);
        }
        Ok(by_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::dao::InMemoryStore;
    use crate::store::models::OwnerProfile;
    use chrono::Duration;

    fn metrics() -> Arc<Metrics> {
        Arc::new(Metrics::standalone().expect("metrics register"))
    }

    fn content(owner_id: Uuid, title: &str, status: ContentStatus, tags: &[&str]) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            owner_id,
            content_type: ContentType::Article,
            category: Some("Productivity".into()),
            tags: tags.iter().map(ToString::to_string).collect(),
            title: Some(title.into()),
            description: Some("A practical walkthrough with examples you can reuse today.".into()),
            has_media: true,
            status,
            created_at: Utc::now() - Duration::days(3),
        }
    }

    async fn seeded(owner_id: Uuid, count: usize) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for index in 0..count {
            store
                .insert_content(content(
                    owner_id,
                    &format!("Deep work session number {index}"),
                    ContentStatus::Completed,
                    &["focus", "habits", "work"],
                ))
                .await;
        }
        store
            .upsert_profile(OwnerProfile {
                owner_id,
                niche: Some("productivity".into()),
                preference_tags: vec!["focus".into()],
            })
            .await;
        store
    }

    #[tokio::test]
    async fn discover_respects_limit_and_min_score() {
        let owner_id = Uuid::new_v4();
        let store = seeded(owner_id, 12).await;
        let pipeline = DiscoveryPipeline::new(
            &Stores::from_backend(store),
            DiscoverySettings::default(),
            metrics(),
        );

        let filters = DiscoveryFilters {
            limit: 3,
            min_score: 40.0,
            ..DiscoveryFilters::default()
        };
        let result = pipeline.discover(owner_id, &filters).await.expect("discover");

        // over-fetch bound: 3 x limit
        assert_eq!(result.total_scored, 9);
        assert_eq!(result.discovered, 3);
        assert!(result.content.len() <= filters.limit);
        assert!(result.content.iter().all(|entry| entry.score.total_score >= 40.0));
    }

    #[tokio::test]
    async fn discover_skips_archived_and_excluded() {
        let owner_id = Uuid::new_v4();
        let store = Arc::new(InMemoryStore::new());
        let kept = content(owner_id, "Weekly review template", ContentStatus::Draft, &["review"]);
        let archived = content(owner_id, "Old planning notes", ContentStatus::Archived, &["review"]);
        let excluded_id = content(owner_id, "Inbox zero again", ContentStatus::Completed, &["email"]);
        let excluded_tag = content(owner_id, "Sponsored tools list", ContentStatus::Completed, &["Sponsored"]);
        for item in [&kept, &archived, &excluded_id, &excluded_tag] {
            store.insert_content(item.clone()).await;
        }
        let pipeline = DiscoveryPipeline::new(
            &Stores::from_backend(store),
            DiscoverySettings::default(),
            metrics(),
        );

        let filters = DiscoveryFilters {
            min_score: 0.0,
            exclude_ids: vec![excluded_id.id],
            exclude_tags: vec!["sponsored".into()],
            ..DiscoveryFilters::default()
        };
        let result = pipeline.discover(owner_id, &filters).await.expect("discover");

        assert_eq!(result.total_scored, 1);
        assert_eq!(result.content[0].content.id, kept.id);
    }

    #[tokio::test]
    async fn excluded_tags_do_not_consume_the_overfetch_window() {
        let owner_id = Uuid::new_v4();
        let store = Arc::new(InMemoryStore::new());
        for index in 0..8 {
            store
                .insert_content(content(
                    owner_id,
                    &format!("Partner spotlight {index}"),
                    ContentStatus::Completed,
                    &["SPONSORED"],
                ))
                .await;
        }
        for index in 0..3 {
            store
                .insert_content(content(
                    owner_id,
                    &format!("Morning planning ritual {index}"),
                    ContentStatus::Completed,
                    &["planning"],
                ))
                .await;
        }
        let pipeline = DiscoveryPipeline::new(
            &Stores::from_backend(store),
            DiscoverySettings::default(),
            metrics(),
        );

        let filters = DiscoveryFilters {
            limit: 2,
            min_score: 0.0,
            exclude_tags: vec!["sponsored".into()],
            ..DiscoveryFilters::default()
        };
        let result = pipeline.discover(owner_id, &filters).await.expect("discover");

        assert_eq!(result.discovered, 2);
        assert_eq!(result.total_scored, 3);
        assert!(result
            .content
            .iter()
            .all(|entry| entry.content.tags == vec!["planning".to_string()]));
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn scoring_future_is_send() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = DiscoveryPipeline::new(
            &Stores::from_backend(store),
            DiscoverySettings::default(),
            metrics(),
        );
        assert_send(pipeline.score_items(Uuid::new_v4(), Vec::new(), ScoreOptions::default()));
        assert_send(pipeline.discover(Uuid::new_v4(), &DiscoveryFilters::default()));
    }

    #[tokio::test]
    async fn history_is_batched_across_chunks_and_parallel_scoring_matches() {
        let owner_id = Uuid::new_v4();
        let store = seeded(owner_id, 10).await;
        let items = store
            .find_content(owner_id, &ContentFilter::default())
            .await
            .expect("content");
        for item in &items {
            store
                .insert_engagement(
                    owner_id,
                    EngagementRecord {
                        content_id: item.id,
                        platform: "twitter".into(),
                        engagement: 100.0,
                        posted_at: Utc::now() - Duration::days(1),
                    },
                )
                .await;
        }
        let stores = Stores::from_backend(store);

        let sequential = DiscoveryPipeline::new(
            &stores,
            DiscoverySettings {
                fetch_concurrency: 2,
                engagement_batch_size: 3,
                parallel_scoring_threshold: usize::MAX,
            },
            metrics(),
        );
        let parallel = DiscoveryPipeline::new(
            &stores,
            DiscoverySettings {
                fetch_concurrency: 2,
                engagement_batch_size: 3,
                parallel_scoring_threshold: 1,
            },
            metrics(),
        );

        let a = sequential
            .score_items(owner_id, items.clone(), ScoreOptions::default())
            .await
            .expect("sequential");
        let b = parallel
            .score_items(owner_id, items, ScoreOptions::default())
            .await
            .expect("parallel");

        assert_eq!(a.len(), 10);
        // avg 100 -> 15, peak 100 -> 3
        assert!(a.iter().all(|entry| (entry.score.factors.performance - 18.0).abs() < 1e-9));
        let totals = |scored: &[ScoredContent]| {
            scored.iter().map(|entry| entry.score.total_score).collect::<Vec<_>>()
        };
        assert_eq!(totals(&a), totals(&b));
    }
}
