use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use super::owner::OwnerId;
use crate::app::AppState;
use crate::curation::auto_schedule::SchedulePlan;
use crate::curation::clustering::ClusterReport;
use crate::curation::discovery::{DiscoveryFilters, DiscoveryResult};
use crate::curation::engine::{
    AutoCurateRequest, BatchCurateRequest, ClusterRequest, CuratedFeed, FeedOptions,
    MAX_PERIOD_DAYS, OptimizeScheduleRequest, SimilarReport, SortBy,
};
use crate::curation::freshness::FreshnessReport;
use crate::curation::gaps::{DEFAULT_GAP_PERIOD_DAYS, GapReport};
use crate::curation::insights::{DEFAULT_INSIGHT_PERIOD_DAYS, InsightReport};
use crate::curation::prediction::PerformancePrediction;
use crate::curation::scoring::{ScoreOptions, ScoreResult};
use crate::curation::CurationOutcome;
use crate::store::models::ContentType;

/// Parses an optional JSON body, falling back to `T::default()` when empty.
pub(crate) fn optional_body<T>(body: &Bytes) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|error| ApiError::invalid(format!("invalid JSON body: {error}")))
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeriodQuery {
    period: Option<i64>,
}

fn period_days(query: &PeriodQuery, default: i64) -> ApiResult<i64> {
    match query.period {
        None => Ok(default),
        Some(days) if (1..=MAX_PERIOD_DAYS).contains(&days) => Ok(days),
        Some(days) => Err(ApiError::invalid(format!(
            "period must be between 1 and {MAX_PERIOD_DAYS} days, got {days}"
        ))),
    }
}

pub(crate) async fn score(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(content_id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<Json<ScoreResult>> {
    let options: ScoreOptions = optional_body(&body)?;
    Ok(Json(state.engine().score_content(owner_id, content_id, options).await?))
}

pub(crate) async fn discover(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    body: Bytes,
) -> ApiResult<Json<DiscoveryResult>> {
    let filters: DiscoveryFilters = optional_body(&body)?;
    Ok(Json(state.engine().discover(owner_id, &filters).await?))
}

pub(crate) async fn auto_curate(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    body: Bytes,
) -> ApiResult<Json<CurationOutcome>> {
    let request: AutoCurateRequest = optional_body(&body)?;
    Ok(Json(state.engine().auto_curate(owner_id, &request).await?))
}

pub(crate) async fn insights(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<InsightReport>> {
    let days = period_days(&query, DEFAULT_INSIGHT_PERIOD_DAYS)?;
    Ok(Json(state.engine().insights(owner_id, days).await?))
}

pub(crate) async fn batch(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<BatchCurateRequest>,
) -> ApiResult<Json<CurationOutcome>> {
    Ok(Json(state.engine().batch_curate(owner_id, &request).await?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeedQuery {
    limit: Option<usize>,
    min_score: Option<f64>,
    /// Comma separated.
    platforms: Option<String>,
    /// Comma separated.
    content_types: Option<String>,
    sort_by: Option<SortBy>,
}

fn split_csv(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl FeedQuery {
    fn into_options(self) -> ApiResult<FeedOptions> {
        let defaults = FeedOptions::default();
        let content_types = split_csv(self.content_types.as_deref())
            .iter()
            .map(|raw| {
                ContentType::parse(raw).ok_or_else(|| ApiError::invalid(format!("unknown content type: {raw}")))
            })
            .collect::<ApiResult<Vec<_>>>()?;
        Ok(FeedOptions {
            limit: self.limit.unwrap_or(defaults.limit),
            min_score: self.min_score.unwrap_or(defaults.min_score),
            platforms: split_csv(self.platforms.as_deref()),
            content_types,
            sort_by: self.sort_by.unwrap_or_default(),
        })
    }
}

pub(crate) async fn feed(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Json<CuratedFeed>> {
    let options = query.into_options()?;
    Ok(Json(state.engine().curated_feed(owner_id, options).await?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimilarQuery {
    threshold: Option<f64>,
}

pub(crate) async fn similar(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(content_id): Path<Uuid>,
    Query(query): Query<SimilarQuery>,
) -> ApiResult<Json<SimilarReport>> {
    if let Some(threshold) = query.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ApiError::invalid(format!("threshold must be between 0 and 1, got {threshold}")));
        }
    }
    Ok(Json(
        state
            .engine()
            .detect_similar(owner_id, content_id, query.threshold)
            .await?,
    ))
}

pub(crate) async fn cluster(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<ClusterRequest>,
) -> ApiResult<Json<ClusterReport>> {
    Ok(Json(state.engine().cluster(owner_id, &request).await?))
}

pub(crate) async fn freshness(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(content_id): Path<Uuid>,
) -> ApiResult<Json<FreshnessReport>> {
    Ok(Json(state.engine().assess_freshness(owner_id, content_id).await?))
}

pub(crate) async fn predict(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(content_id): Path<Uuid>,
) -> ApiResult<Json<PerformancePrediction>> {
    Ok(Json(state.engine().predict_performance(owner_id, content_id).await?))
}

pub(crate) async fn gaps(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Json<GapReport>> {
    let days = period_days(&query, DEFAULT_GAP_PERIOD_DAYS)?;
    Ok(Json(state.engine().analyze_gaps(owner_id, days).await?))
}

pub(crate) async fn optimize_schedule(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(request): Json<OptimizeScheduleRequest>,
) -> ApiResult<Json<SchedulePlan>> {
    Ok(Json(state.engine().optimize_schedule(owner_id, &request).await?))
}
