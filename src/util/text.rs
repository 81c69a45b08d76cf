//! Text helpers shared by scoring and similarity.
use rustc_hash::FxHashSet;

/// Lower-cased whitespace tokens of `text` as a set.
#[must_use]
pub fn word_set(text: &str) -> FxHashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// Jaccard word overlap `|A ∩ B| / |A ∪ B|` over lower-cased whitespace tokens.
///
/// Returns 0.0 when both sides are empty.
#[must_use]
pub fn jaccard_similarity(left: &str, right: &str) -> f64 {
    let left = word_set(left);
    let right = word_set(right);

    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();

    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Case-insensitive substring containment in either direction.
///
/// Deliberately loose: "art" matches "smart".
#[must_use]
pub fn contains_either(left: &str, right: &str) -> bool {
    let left = left.to_lowercase();
    let right = right.to_lowercase();
    left.contains(&right) || right.contains(&left)
}

/// Tags present in both slices, exact match, in `left` order.
#[must_use]
pub fn common_tags<'a>(left: &'a [String], right: &[String]) -> Vec<&'a String> {
    left.iter().filter(|tag| right.contains(tag)).collect()
}

/// Appends tags from `extra` not already present in `target`, keeping first-seen order.
pub fn merge_tags(target: &mut Vec<String>, extra: &[String]) {
    for tag in extra {
        if !target.contains(tag) {
            target.push(tag.clone());
        }
    }
}
