//! Pairwise content similarity and near-duplicate detection.
use serde::Serialize;

use crate::store::models::ContentItem;
use crate::util::text::{common_tags, jaccard_similarity};
use crate::util::time::round_to;

const TITLE_WEIGHT: f64 = 0.3;
const DESCRIPTION_WEIGHT: f64 = 0.3;
const CATEGORY_WEIGHT: f64 = 0.2;
const TAG_WEIGHT: f64 = 0.2;
const SIMILAR_TITLE_THRESHOLD: f64 = 0.5;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

fn populated(field: Option<&String>) -> Option<&str> {
    field.map(String::as_str).filter(|value| !value.is_empty())
}

fn same_category(left: &ContentItem, right: &ContentItem) -> Option<bool> {
    let left = populated(left.category.as_ref())?;
    let right = populated(right.category.as_ref())?;
    Some(left.to_lowercase() == right.to_lowercase())
}

/// Weighted similarity in `[0, 1]`.
///
/// Each term counts only when both items carry the field; the result is
/// renormalised by the weights that contributed. Items sharing no populated
/// field score 0.
#[must_use]
pub fn similarity(left: &ContentItem, right: &ContentItem) -> f64 {
    let mut weighted = 0.0;
    let mut weights = 0.0;

    if let (Some(a), Some(b)) = (populated(left.title.as_ref()), populated(right.title.as_ref())) {
        weighted += jaccard_similarity(a, b) * TITLE_WEIGHT;
        weights += TITLE_WEIGHT;
    }

    if let (Some(a), Some(b)) = (
        populated(left.description.as_ref()),
        populated(right.description.as_ref()),
    ) {
        weighted += jaccard_similarity(a, b) * DESCRIPTION_WEIGHT;
        weights += DESCRIPTION_WEIGHT;
    }

    if let Some(matches) = same_category(left, right) {
        if matches {
            weighted += CATEGORY_WEIGHT;
        }
        weights += CATEGORY_WEIGHT;
    }

    if !left.tags.is_empty() && !right.tags.is_empty() {
        let shared = common_tags(&left.tags, &right.tags).len();
        let ratio = shared as f64 / left.tags.len().max(right.tags.len()) as f64;
        weighted += ratio.min(1.0) * TAG_WEIGHT;
        weights += TAG_WEIGHT;
    }

    if weights > 0.0 {
        weighted / weights
    } else {
        0.0
    }
}

/// Human-readable triggers behind a similarity score.
#[must_use]
pub fn similarity_reasons(left: &ContentItem, right: &ContentItem) -> Vec<String> {
    let mut reasons = Vec::new();

    if same_category(left, right) == Some(true) {
        reasons.push("Same category".to_string());
    }

    let shared = common_tags(&left.tags, &right.tags).len();
    if shared > 0 {
        reasons.push(format!("{shared} common tags"));
    }

    if let (Some(a), Some(b)) = (populated(left.title.as_ref()), populated(right.title.as_ref())) {
        if jaccard_similarity(a, b) > SIMILAR_TITLE_THRESHOLD {
            reasons.push("Similar titles".to_string());
        }
    }

    reasons
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarMatch {
    pub content: ContentItem,
    /// Rounded to two decimals.
    pub similarity: f64,
    pub reasons: Vec<String>,
}

/// Candidates whose rounded similarity to `target` reaches `threshold`,
/// most similar first. The target itself is skipped if present.
#[must_use]
pub fn detect_similar(
    target: &ContentItem,
    candidates: Vec<ContentItem>,
    threshold: f64,
) -> Vec<SimilarMatch> {
    let mut matches: Vec<SimilarMatch> = candidates
        .into_iter()
        .filter(|candidate| candidate.id != target.id)
        .filter_map(|candidate| {
            let score = round_to(similarity(target, &candidate), 2);
            (score >= threshold).then(|| SimilarMatch {
                reasons: similarity_reasons(target, &candidate),
                content: candidate,
                similarity: score,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches
}
