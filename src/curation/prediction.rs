//! Engagement trend projection for a single item.
//!
//! The last five posts are compared against everything before them; the
//! relative change is applied once more to the recent average.

use serde::Serialize;
use uuid::Uuid;

use super::scoring::{ScoreFactors, ScoreResult};
use crate::store::models::EngagementRecord;
use crate::util::time::round_to;

const RECENT_WINDOW: usize = 5;
const MIN_POSTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    fn from_posts(posts: usize) -> Self {
        match posts {
            n if n >= 5 => Confidence::High,
            n if n >= 3 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngagementForecast {
    pub current_average: f64,
    pub predicted_engagement: f64,
    /// Percent change of the recent window over the older posts.
    pub trend_percent: f64,
    pub confidence: Confidence,
    pub outlook: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePrediction {
    pub content_id: Uuid,
    pub curation_score: f64,
    /// `None` until the item has been posted at least twice.
    pub predicted_performance: Option<EngagementForecast>,
    pub recommendation: &'static str,
    pub factors: ScoreFactors,
}

impl PerformancePrediction {
    #[must_use]
    pub fn new(content_id: Uuid, score: &ScoreResult, history: &[EngagementRecord]) -> Self {
        Self {
            content_id,
            curation_score: score.total_score,
            predicted_performance: forecast(history),
            recommendation: score.recommendation,
            factors: score.factors,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn average(records: &[&EngagementRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|record| record.engagement).sum::<f64>() / records.len() as f64
}

/// Projects the next post's engagement from `history`, oldest first after sorting.
#[must_use]
pub fn forecast(history: &[EngagementRecord]) -> Option<EngagementForecast> {
    if history.len() < MIN_POSTS {
        return None;
    }
    let mut posts: Vec<&EngagementRecord> = history.iter().collect();
    posts.sort_by_key(|record| record.posted_at);

    let recent = &posts[posts.len().saturating_sub(RECENT_WINDOW)..];
    let older = &posts[..posts.len().saturating_sub(RECENT_WINDOW).max(1)];
    let recent_average = average(recent);
    let older_average = average(older);

    let trend = if older_average > 0.0 {
        (recent_average / older_average - 1.0) * 100.0
    } else {
        0.0
    };
    let predicted = (recent_average * (1.0 + trend / 100.0)).max(0.0);

    Some(EngagementForecast {
        current_average: recent_average.round(),
        predicted_engagement: predicted.round(),
        trend_percent: round_to(trend, 1),
        confidence: Confidence::from_posts(posts.len()),
        outlook: if trend > 0.0 {
            "Performance is improving. Continue current strategy."
        } else {
            "Performance is declining. Consider content refresh or strategy change."
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rstest::rstest;

    fn history(engagements: &[f64]) -> Vec<EngagementRecord> {
        let content_id = Uuid::new_v4();
        let start = Utc::now() - Duration::days(60);
        engagements
            .iter()
            .enumerate()
            .map(|(index, &engagement)| EngagementRecord {
                content_id,
                platform: "twitter".into(),
                engagement,
                posted_at: start + Duration::days(i64::try_from(index).expect("small index")),
            })
            .collect()
    }

    #[test]
    fn single_post_has_no_forecast() {
        assert_eq!(forecast(&history(&[120.0])), None);
        assert_eq!(forecast(&[]), None);
    }

    #[test]
    fn rising_engagement_projects_upward() {
        let forecast = forecast(&history(&[100.0, 150.0])).expect("forecast");
        assert!((forecast.current_average - 125.0).abs() < f64::EPSILON);
        assert!((forecast.trend_percent - 25.0).abs() < f64::EPSILON);
        assert!((forecast.predicted_engagement - 156.0).abs() < f64::EPSILON);
        assert_eq!(forecast.confidence, Confidence::Low);
        assert!(forecast.outlook.contains("improving"));
    }

    #[test]
    fn older_posts_are_those_before_the_recent_window() {
        let mut records = history(&[200.0, 100.0, 100.0, 100.0, 100.0, 100.0]);
        records.reverse();
        let forecast = forecast(&records).expect("forecast");
        assert!((forecast.trend_percent + 50.0).abs() < f64::EPSILON);
        assert!((forecast.predicted_engagement - 50.0).abs() < f64::EPSILON);
        assert!(forecast.outlook.contains("declining"));
    }

    #[test]
    fn zero_baseline_reports_flat_trend() {
        let forecast = forecast(&history(&[0.0, 40.0, 80.0])).expect("forecast");
        assert!(forecast.trend_percent.abs() < f64::EPSILON);
        assert!((forecast.predicted_engagement - 40.0).abs() < f64::EPSILON);
    }

    #[rstest]
    #[case(2, Confidence::Low)]
    #[case(3, Confidence::Medium)]
    #[case(4, Confidence::Medium)]
    #[case(5, Confidence::High)]
    #[case(9, Confidence::High)]
    fn confidence_follows_post_count(#[case] posts: usize, #[case] expected: Confidence) {
        let forecast = forecast(&history(&vec![10.0; posts])).expect("forecast");
        assert_eq!(forecast.confidence, expected);
    }
}
