//! Turns ranked content into scheduled-post records.
//!
//! Two modes: every (item, platform) pair at one explicit time, or a
//! windowed plan that walks days and platforms round-robin, highest score
//! first, asking the advisor for the hour of each slot.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::PerformanceAdvisor;
use crate::observability::metrics::Metrics;
use crate::store::dao::SchedulingDao;
use crate::store::models::{ContentItem, CurationSource, ScheduledPostRecord};

pub const SCHEDULED_STATUS: &str = "scheduled";
const FALLBACK_BASE_HOUR: u32 = 9;
const FALLBACK_ROTATION: u32 = 3;

/// Default posting time when no explicit date is given.
#[must_use]
pub fn default_schedule_time(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(24)
}

#[must_use]
pub fn build_records(
    owner_id: Uuid,
    items: &[&ContentItem],
    platforms: &[String],
    scheduled_time: DateTime<Utc>,
    source: Option<CurationSource>,
) -> Vec<ScheduledPostRecord> {
    items
        .iter()
        .flat_map(|item| {
            platforms.iter().map(move |platform| ScheduledPostRecord {
                id: Uuid::new_v4(),
                owner_id,
                content_id: item.id,
                platform: platform.clone(),
                scheduled_time,
                status: SCHEDULED_STATUS.to_string(),
                title: item.title.clone(),
                description: item.description.clone(),
                content_type: item.content_type,
                curation_source: source,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlotReason {
    #[serde(rename = "Optimal time")]
    OptimalTime,
    #[serde(rename = "Default schedule")]
    DefaultSchedule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleSlot {
    pub content_id: Uuid,
    pub title: Option<String>,
    pub platform: String,
    pub scheduled_time: DateTime<Utc>,
    pub score: f64,
    pub reason: SlotReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulePlan {
    pub schedule: Vec<ScheduleSlot>,
    pub total_items: usize,
    pub duration: u32,
    pub platforms: Vec<String>,
    /// True when at least one slot used advisor hours.
    pub optimized: bool,
}

/// Picks the hour for `day` from advisor data, or the 9/10/11 rotation.
#[must_use]
pub fn slot_hour(advisor_hours: &[i64], day: u32) -> (u32, SlotReason) {
    let valid: Vec<u32> = advisor_hours
        .iter()
        .filter_map(|&hour| u32::try_from(hour).ok().filter(|hour| *hour < 24))
        .collect();
    if valid.is_empty() {
        return (FALLBACK_BASE_HOUR + day % FALLBACK_ROTATION, SlotReason::DefaultSchedule);
    }
    let index = usize::try_from(day).unwrap_or(0) % valid.len();
    (valid[index], SlotReason::OptimalTime)
}

#[derive(Clone)]
pub struct AutoScheduler {
    scheduling: Arc<dyn SchedulingDao>,
    advisor: Arc<dyn PerformanceAdvisor>,
    metrics: Arc<Metrics>,
}

impl AutoScheduler {
    pub fn new(
        scheduling: Arc<dyn SchedulingDao>,
        advisor: Arc<dyn PerformanceAdvisor>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            scheduling,
            advisor,
            metrics,
        }
    }

    /// Persists one record per (item, platform) at `scheduled_time` and
    /// returns how many were written.
    ///
    /// # Errors
    /// Propagates scheduling store failures.
    pub async fn schedule_at(
        &self,
        owner_id: Uuid,
        items: &[&ContentItem],
        platforms: &[String],
        scheduled_time: DateTime<Utc>,
        source: Option<CurationSource>,
    ) -> Result<usize> {
        let records = build_records(owner_id, items, platforms, scheduled_time, source);
        if records.is_empty() {
            return Ok(0);
        }
        self.scheduling
            .insert_scheduled_posts(&records)
            .await
            .context("failed to insert scheduled posts")?;
        self.metrics.posts_scheduled.inc_by(records.len() as f64);
        info!(
            owner_id = %owner_id,
            scheduled = records.len(),
            scheduled_time = %scheduled_time,
            "scheduled curated content"
        );
        Ok(records.len())
    }

    /// Plans a window of `duration_days` days from `start`. `ranked` must be
    /// sorted best first; each item gets at most one slot.
    pub async fn plan_window(
        &self,
        owner_id: Uuid,
        ranked: &[(ContentItem, f64)],
        platforms: &[String],
        start: DateTime<Utc>,
        duration_days: u32,
    ) -> SchedulePlan {
        let mut schedule = Vec::new();
        let mut next_item = ranked.iter();

        'days: for day in 0..duration_days {
            let Some(date) = start.date_naive().checked_add_days(Days::new(u64::from(day))) else {
                break;
            };
            for platform in platforms {
                let Some((item, score)) = next_item.next() else {
                    break 'days;
                };

                let hours = match self.advisor.optimal_hours(owner_id, platform, date).await {
                    Ok(hours) => hours,
                    Err(error) => {
                        warn!(
                            owner_id = %owner_id,
                            platform = %platform,
                            error = %error,
                            "performance advisor unavailable, using default hours"
                        );
                        Vec::new()
                    }
                };
                let (hour, reason) = slot_hour(&hours, day);
                if reason == SlotReason::DefaultSchedule {
                    self.metrics.advisor_fallbacks.inc();
                }
                let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);

                schedule.push(ScheduleSlot {
                    content_id: item.id,
                    title: item.title.clone(),
                    platform: platform.clone(),
                    scheduled_time: date.and_time(time).and_utc(),
                    score: *score,
                    reason,
                });
            }
        }

        let optimized = schedule
            .iter()
            .any(|slot| slot.reason == SlotReason::OptimalTime);
        SchedulePlan {
            total_items: schedule.len(),
            schedule,
            duration: duration_days,
            platforms: platforms.to_vec(),
            optimized,
        }
    }
}
