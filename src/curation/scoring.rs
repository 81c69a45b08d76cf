//! Multi-factor curation score.
//!
//! Five additive factors, each capped independently:
//! performance 30, relevance 25, recency 20, engagement potential 15, quality 10.
//! Everything here is pure so candidates can be scored in parallel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::models::{ContentItem, ContentStatus, ContentType, EngagementRecord, OwnerProfile};
use crate::util::text::contains_either;
use crate::util::time::{days_between, round_to};

pub const MAX_SCORE: f64 = 100.0;

const PERFORMANCE_CAP: f64 = 30.0;
const RELEVANCE_CAP: f64 = 25.0;
const TAG_RELEVANCE_CAP: f64 = 15.0;
const ENGAGEMENT_CAP: f64 = 15.0;
const QUALITY_CAP: f64 = 10.0;

fn enabled() -> bool {
    true
}

/// Switches individual factors off. Quality is always scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOptions {
    #[serde(default = "enabled")]
    pub consider_performance: bool,
    #[serde(default = "enabled")]
    pub consider_relevance: bool,
    #[serde(default = "enabled")]
    pub consider_recency: bool,
    #[serde(default = "enabled")]
    pub consider_engagement: bool,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            consider_performance: true,
            consider_relevance: true,
            consider_recency: true,
            consider_engagement: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub performance: f64,
    pub relevance: f64,
    pub recency: f64,
    pub engagement_potential: f64,
    pub quality: f64,
}

impl ScoreFactors {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.performance + self.relevance + self.recency + self.engagement_potential + self.quality
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Grade::A
        } else if score >= 70.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::C
        } else if score >= 50.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    #[must_use]
    pub fn recommendation(self) -> &'static str {
        match self {
            Grade::A => "Highly recommended for curation - excellent content",
            Grade::B => "Recommended for curation - good content",
            Grade::C => "Consider for curation - acceptable content",
            Grade::D => "Low priority - needs improvement",
            Grade::F => "Not recommended - significant improvements needed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    /// Rounded to one decimal.
    pub total_score: f64,
    pub max_score: f64,
    pub percentage: i64,
    pub factors: ScoreFactors,
    pub grade: Grade,
    pub recommendation: &'static str,
}

/// Scores one content item.
///
/// `history` should hold the posted records of this item only; records for
/// other items are ignored.
#[must_use]
pub fn score_content(
    content: &ContentItem,
    history: &[EngagementRecord],
    profile: Option<&OwnerProfile>,
    options: &ScoreOptions,
    now: DateTime<Utc>,
) -> ScoreResult {
    let factors = ScoreFactors {
        performance: if options.consider_performance {
            performance_factor(content, history)
        } else {
            0.0
        },
        relevance: match profile {
            Some(profile) if options.consider_relevance => relevance_factor(content, profile),
            _ => 0.0,
        },
        recency: if options.consider_recency {
            recency_factor(days_between(content.created_at, now))
        } else {
            0.0
        },
        engagement_potential: if options.consider_engagement {
            engagement_potential_factor(content)
        } else {
            0.0
        },
        quality: quality_factor(content),
    };

    let total = factors.total();
    let grade = Grade::from_score(total);

    #[allow(clippy::cast_possible_truncation)]
    let percentage = (total / MAX_SCORE * 100.0).round() as i64;

    ScoreResult {
        total_score: round_to(total, 1),
        max_score: MAX_SCORE,
        percentage,
        factors,
        grade,
        recommendation: grade.recommendation(),
    }
}

fn performance_factor(content: &ContentItem, history: &[EngagementRecord]) -> f64 {
    let engagements: Vec<f64> = history
        .iter()
        .filter(|record| record.content_id == content.id)
        .map(|record| record.engagement)
        .collect();
    if engagements.is_empty() {
        return 0.0;
    }

    let average = engagements.iter().sum::<f64>() / engagements.len() as f64;
    let peak = engagements.iter().copied().fold(f64::MIN, f64::max);

    PERFORMANCE_CAP.min((average / 100.0) * 15.0 + (peak / 500.0) * 15.0)
}

fn relevance_factor(content: &ContentItem, profile: &OwnerProfile) -> f64 {
    let mut relevance = 0.0;

    let niche = profile.niche.as_deref().filter(|niche| !niche.is_empty());
    let category = content.category.as_deref().filter(|category| !category.is_empty());
    if let (Some(niche), Some(category)) = (niche, category) {
        if contains_either(category, niche) {
            relevance += 10.0;
        }
    }

    let matching_tags = content
        .tags
        .iter()
        .filter(|tag| {
            profile
                .preference_tags
                .iter()
                .any(|preferred| contains_either(tag, preferred))
        })
        .count();
    relevance += TAG_RELEVANCE_CAP.min(3.0 * matching_tags as f64);

    RELEVANCE_CAP.min(relevance)
}

fn recency_factor(age_days: f64) -> f64 {
    if age_days < 7.0 {
        20.0
    } else if age_days < 30.0 {
        15.0
    } else if age_days < 90.0 {
        10.0
    } else {
        (5.0 - (age_days - 90.0) / 30.0).max(0.0)
    }
}

fn title_in_range(content: &ContentItem) -> bool {
    content
        .title
        .as_deref()
        .is_some_and(|title| (10..=100).contains(&title.chars().count()))
}

fn description_len(content: &ContentItem) -> usize {
    content
        .description
        .as_deref()
        .map_or(0, |description| description.chars().count())
}

fn engagement_potential_factor(content: &ContentItem) -> f64 {
    let mut potential = 0.0;
    if title_in_range(content) {
        potential += 3.0;
    }
    if description_len(content) >= 50 {
        potential += 3.0;
    }
    if !content.tags.is_empty() {
        potential += 2.0;
    }
    if content.has_media {
        potential += 4.0;
    }
    if content.content_type == ContentType::Video {
        potential += 3.0;
    }
    ENGAGEMENT_CAP.min(potential)
}

fn quality_factor(content: &ContentItem) -> f64 {
    let mut quality = 0.0;
    if title_in_range(content) {
        quality += 2.0;
    }
    let description_len = description_len(content);
    if description_len >= 50 {
        quality += 2.0;
    }
    if description_len >= 200 {
        quality += 1.0;
    }
    if content.tags.len() >= 3 {
        quality += 2.0;
    }
    if content.has_media {
        quality += 2.0;
    }
    if content.status == ContentStatus::Completed {
        quality += 1.0;
    }
    QUALITY_CAP.min(quality)
}
