use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::models::{ContentItem, EngagementRecord, OwnerProfile};

const MIN_CONTENT_TYPES: usize = 3;
const MIN_PLATFORMS: usize = 2;
const MIN_DISTINCT_TAGS: usize = 10;

pub const DEFAULT_GAP_PERIOD_DAYS: i64 = 90;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GapReport {
    pub period_days: i64,
    pub content_types: BTreeMap<String, usize>,
    pub platforms: BTreeMap<String, usize>,
    pub categories: BTreeMap<String, usize>,
    pub tags: BTreeMap<String, usize>,
    pub recommendations: Vec<String>,
}

/// Distribution of recent content and posts, with diversification hints.
///
/// `items` are the owner's items created in the period and `posted` the
/// posted records in the same period.
#[must_use]
pub fn analyze_gaps(
    items: &[ContentItem],
    posted: &[EngagementRecord],
    profile: Option<&OwnerProfile>,
    period_days: i64,
) -> GapReport {
    let mut report = GapReport {
        period_days,
        ..GapReport::default()
    };

    for item in items {
        *report
            .content_types
            .entry(item.content_type.as_str().to_string())
            .or_default() += 1;
        if let Some(category) = item.category.as_ref().filter(|category| !category.is_empty()) {
            *report.categories.entry(category.clone()).or_default() += 1;
        }
        for tag in &item.tags {
            *report.tags.entry(tag.clone()).or_default() += 1;
        }
    }
    for record in posted {
        *report.platforms.entry(record.platform.clone()).or_default() += 1;
    }

    if report.content_types.len() < MIN_CONTENT_TYPES {
        report.recommendations.push(format!(
            "Consider diversifying content types. You're primarily using: {}",
            joined_keys(&report.content_types)
        ));
    }
    if report.platforms.len() < MIN_PLATFORMS {
        report.recommendations.push(format!(
            "Consider posting to more platforms. Currently using: {}",
            joined_keys(&report.platforms)
        ));
    }
    if let Some(niche) = profile
        .and_then(|profile| profile.niche.as_deref())
        .filter(|niche| !niche.is_empty())
    {
        if report.categories.is_empty() {
            report
                .recommendations
                .push(format!("Consider creating content in your niche category: {niche}"));
        }
    }
    if report.tags.len() < MIN_DISTINCT_TAGS {
        report
            .recommendations
            .push("Consider using more diverse tags to reach broader audiences.".to_string());
    }

    report
}

fn joined_keys(map: &BTreeMap<String, usize>) -> String {
    map.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}
