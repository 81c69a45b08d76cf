use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::store::models::{ContentItem, EngagementRecord};
use crate::util::time::days_between;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessStatus {
    Fresh,
    Aging,
    Stale,
}

impl FreshnessStatus {
    fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            FreshnessStatus::Fresh
        } else if score >= 50.0 {
            FreshnessStatus::Aging
        } else {
            FreshnessStatus::Stale
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreshnessReport {
    pub content_id: Uuid,
    pub title: Option<String>,
    pub days_since_creation: i64,
    /// `None` when the item was never posted.
    pub days_since_last_post: Option<i64>,
    pub freshness_score: i64,
    pub staleness_score: i64,
    pub status: FreshnessStatus,
    pub recommendations: Vec<String>,
}

#[allow(clippy::cast_possible_truncation)]
fn rounded(value: f64) -> i64 {
    value.round() as i64
}

/// Age and posting-recency decay of one item.
///
/// `last_post` is the item's most recent posted record, if any.
#[must_use]
pub fn assess_freshness(
    content: &ContentItem,
    last_post: Option<&EngagementRecord>,
    now: DateTime<Utc>,
) -> FreshnessReport {
    let age_days = days_between(content.created_at, now);
    let since_post = last_post.map(|post| days_between(post.posted_at, now));

    let mut freshness: f64 = 100.0;
    let mut staleness: f64 = 0.0;

    // mutually exclusive age bands
    if age_days > 365.0 {
        staleness += 50.0;
        freshness -= 30.0;
    } else if age_days > 180.0 {
        staleness += 30.0;
        freshness -= 20.0;
    } else if age_days > 90.0 {
        staleness += 15.0;
        freshness -= 10.0;
    }

    if let (Some(post), Some(days)) = (last_post, since_post) {
        if days > 180.0 {
            staleness += 20.0;
            freshness -= 15.0;
        } else if days > 90.0 {
            staleness += 10.0;
            freshness -= 10.0;
        }

        if post.engagement > 0.0 && days > 30.0 {
            staleness += 10.0;
            freshness -= 5.0;
        }
    }

    let freshness = freshness.clamp(0.0, 100.0);
    let staleness = staleness.clamp(0.0, 100.0);

    FreshnessReport {
        content_id: content.id,
        title: content.title.clone(),
        days_since_creation: rounded(age_days),
        days_since_last_post: since_post.map(rounded),
        freshness_score: rounded(freshness),
        staleness_score: rounded(staleness),
        status: FreshnessStatus::from_score(freshness),
        recommendations: recommendations(freshness, age_days, since_post.unwrap_or(age_days)),
    }
}

fn recommendations(freshness: f64, age_days: f64, idle_days: f64) -> Vec<String> {
    let mut out = Vec::new();
    if freshness < 50.0 {
        out.push("Content is stale. Consider updating or repurposing.".to_string());
    }
    if idle_days > 90.0 {
        out.push("Content hasn't been posted recently. Consider reposting with updates.".to_string());
    }
    if age_days > 180.0 {
        out.push("Content is old. Consider refreshing with new information or angles.".to_string());
    }
    if freshness >= 70.0 {
        out.push("Content is fresh. Good to curate and schedule.".to_string());
    }
    out
}
