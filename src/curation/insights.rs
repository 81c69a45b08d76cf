//! Portfolio-level summary of scored content.
use std::collections::BTreeMap;

use serde::Serialize;

use super::discovery::ScoredContent;
use super::scoring::Grade;
use crate::util::time::round_to;

pub const DEFAULT_INSIGHT_PERIOD_DAYS: i64 = 30;

const LISTED_ITEMS: usize = 10;
const IMPROVEMENT_THRESHOLD: f64 = 60.0;
const POOR_SCORE: f64 = 50.0;
const POOR_SHARE: f64 = 0.3;
const LOW_RELEVANCE: f64 = 10.0;
const LOW_QUALITY: f64 = 5.0;
const WEAK_FACTOR_SHARE: f64 = 0.2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub total_content: usize,
    /// Mean total score, one decimal; 0 for an empty period.
    pub average_score: f64,
    pub grade_distribution: BTreeMap<Grade, usize>,
    pub top_performers: Vec<ScoredContent>,
    pub needs_improvement: Vec<ScoredContent>,
    pub recommendations: Vec<String>,
}

fn share(count: usize, total: usize) -> f64 {
    count as f64 / total as f64
}

#[must_use]
pub fn summarize(scored: &[ScoredContent]) -> InsightReport {
    let mut grade_distribution: BTreeMap<Grade, usize> =
        [Grade::A, Grade::B, Grade::C, Grade::D, Grade::F]
            .into_iter()
            .map(|grade| (grade, 0))
            .collect();
    for entry in scored {
        *grade_distribution.entry(entry.score.grade).or_default() += 1;
    }

    let total = scored.len();
    let average = if total == 0 {
        0.0
    } else {
        scored.iter().map(|entry| entry.score.total_score).sum::<f64>() / total as f64
    };

    let mut ranked: Vec<&ScoredContent> = scored.iter().collect();
    ranked.sort_by(|a, b| b.score.total_score.total_cmp(&a.score.total_score));
    let top_performers = ranked.iter().take(LISTED_ITEMS).map(|entry| (*entry).clone()).collect();
    let needs_improvement = ranked
        .iter()
        .rev()
        .filter(|entry| entry.score.total_score < IMPROVEMENT_THRESHOLD)
        .take(LISTED_ITEMS)
        .map(|entry| (*entry).clone())
        .collect();

    let mut recommendations = Vec::new();
    if total > 0 {
        if average < IMPROVEMENT_THRESHOLD {
            recommendations.push(
                "Overall content quality is below average. Focus on improving content quality."
                    .to_string(),
            );
        }
        let poor = scored
            .iter()
            .filter(|entry| entry.score.total_score < POOR_SCORE)
            .count();
        if share(poor, total) > POOR_SHARE {
            recommendations.push(format!(
                "{poor} items need significant improvement. Consider reviewing and updating low-scoring content."
            ));
        }
        let weak_relevance = scored
            .iter()
            .filter(|entry| entry.score.factors.relevance < LOW_RELEVANCE)
            .count();
        if share(weak_relevance, total) > WEAK_FACTOR_SHARE {
            recommendations
                .push("Many items lack relevance. Consider adding better tags and categories.".to_string());
        }
        let weak_quality = scored
            .iter()
            .filter(|entry| entry.score.factors.quality < LOW_QUALITY)
            .count();
        if share(weak_quality, total) > WEAK_FACTOR_SHARE {
            recommendations.push(
                "Many items need quality improvements. Add descriptions, tags, and media.".to_string(),
            );
        }
    }

    InsightReport {
        total_content: total,
        average_score: round_to(average, 1),
        grade_distribution,
        top_performers,
        needs_improvement,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curation::scoring::{MAX_SCORE, ScoreFactors, ScoreResult};
    use crate::store::models::{ContentItem, ContentStatus, ContentType};
    use chrono::Utc;
    use uuid::Uuid;

    fn scored(total: f64, relevance: f64, quality: f64) -> ScoredContent {
        let grade = Grade::from_score(total);
        ScoredContent {
            content: ContentItem {
                id: Uuid::new_v4(),
                owner_id: Uuid::nil(),
                content_type: ContentType::Article,
                category: None,
                tags: Vec::new(),
                title: None,
                description: None,
                has_media: false,
                status: ContentStatus::Draft,
                created_at: Utc::now(),
            },
            score: ScoreResult {
                total_score: total,
                max_score: MAX_SCORE,
                percentage: total.round() as i64,
                factors: ScoreFactors {
                    relevance,
                    quality,
                    ..ScoreFactors::default()
                },
                grade,
                recommendation: grade.recommendation(),
            },
        }
    }

    #[test]
    fn empty_period_is_all_zero() {
        let report = summarize(&[]);
        assert_eq!(report.total_content, 0);
        assert!(report.average_score.abs() < f64::EPSILON);
        assert!(report.recommendations.is_empty());
        assert_eq!(report.grade_distribution.len(), 5);
        assert!(report.grade_distribution.values().all(|count| *count == 0));
    }

    #[test]
    fn weak_portfolio_gets_every_recommendation() {
        let items = vec![
            scored(30.0, 0.0, 2.0),
            scored(45.0, 5.0, 3.0),
            scored(85.0, 20.0, 9.0),
        ];
        let report = summarize(&items);

        assert!((report.average_score - 53.3).abs() < 1e-9);
        assert_eq!(report.grade_distribution[&Grade::A], 1);
        assert_eq!(report.grade_distribution[&Grade::F], 2);
        assert_eq!(
            report.recommendations,
            vec![
                "Overall content quality is below average. Focus on improving content quality.",
                "2 items need significant improvement. Consider reviewing and updating low-scoring content.",
                "Many items lack relevance. Consider adding better tags and categories.",
                "Many items need quality improvements. Add descriptions, tags, and media.",
            ]
        );
    }

    #[test]
    fn top_and_bottom_lists_are_ordered_and_capped() {
        let items: Vec<ScoredContent> = (0..15)
            .map(|index| scored(f64::from(index) * 6.0, 20.0, 8.0))
            .collect();
        let report = summarize(&items);

        assert_eq!(report.top_performers.len(), 10);
        assert!((report.top_performers[0].score.total_score - 84.0).abs() < f64::EPSILON);
        assert!(report
            .top_performers
            .windows(2)
            .all(|pair| pair[0].score.total_score >= pair[1].score.total_score));

        // 0, 6, ..., 54 are below 60
        assert_eq!(report.needs_improvement.len(), 10);
        assert!(report.needs_improvement[0].score.total_score.abs() < f64::EPSILON);
        assert!(report
            .needs_improvement
            .iter()
            .all(|entry| entry.score.total_score < 60.0));
    }
}
