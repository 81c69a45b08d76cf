//! Greedy seed-based clustering of near-duplicate items.
//!
//! Each unassigned item in input order seeds a cluster and pulls in every
//! later unassigned item whose similarity to the seed reaches the threshold.
//! Membership is relative to the seed only; two members need not be similar
//! to each other.

use serde::{Deserialize, Serialize};

use super::similarity::similarity;
use crate::store::models::ContentItem;
use crate::util::text::merge_tags;

const MAX_UNCLUSTERED: usize = 10;

fn default_threshold() -> f64 {
    0.6
}

fn default_max_clusters() -> usize {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterOptions {
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: default_threshold(),
            max_clusters: default_max_clusters(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentCluster {
    pub id: usize,
    pub items: Vec<ContentItem>,
    /// Union of member tags, first-seen order.
    pub common_tags: Vec<String>,
    /// Category of the seed item.
    pub common_category: Option<String>,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterReport {
    pub clusters: Vec<ContentCluster>,
    pub unclustered: Vec<ContentItem>,
    /// Members across every multi-item cluster, counted before truncation.
    pub total_clustered: usize,
}

/// Index groups produced by the seed pass. Every group has at least two members
/// and its first index is the seed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedGrouping {
    pub groups: Vec<Vec<usize>>,
    pub unclustered: Vec<usize>,
}

#[must_use]
pub fn group_by_seed(items: &[ContentItem], threshold: f64) -> SeedGrouping {
    let mut assigned = vec![false; items.len()];
    let mut grouping = SeedGrouping::default();

    for seed in 0..items.len() {
        if assigned[seed] {
            continue;
        }

        let mut members = vec![seed];
        for candidate in (seed + 1)..items.len() {
            if assigned[candidate] {
                continue;
            }
            if similarity(&items[seed], &items[candidate]) >= threshold {
                assigned[candidate] = true;
                members.push(candidate);
            }
        }

        if members.len() > 1 {
            assigned[seed] = true;
            grouping.groups.push(members);
        } else {
            grouping.unclustered.push(seed);
        }
    }

    grouping
}

/// Clusters `items`, ranks clusters by mean member score and truncates.
///
/// `score_of` returns the rounded total score of one item.
pub fn cluster_content<F>(items: &[ContentItem], options: &ClusterOptions, score_of: F) -> ClusterReport
where
    F: Fn(&ContentItem) -> f64,
{
    let grouping = group_by_seed(items, options.similarity_threshold);

    let mut clusters: Vec<ContentCluster> = grouping
        .groups
        .iter()
        .enumerate()
        .map(|(id, members)| {
            let seed = &items[members[0]];
            let mut common_tags = Vec::new();
            let mut total = 0.0;
            let mut cluster_items = Vec::with_capacity(members.len());
            for &index in members {
                let item = &items[index];
                merge_tags(&mut common_tags, &item.tags);
                total += score_of(item);
                cluster_items.push(item.clone());
            }
            ContentCluster {
                id,
                common_category: seed.category.clone(),
                avg_score: total / members.len() as f64,
                items: cluster_items,
                common_tags,
            }
        })
        .collect();

    let total_clustered = clusters.iter().map(|cluster| cluster.items.len()).sum();

    clusters.sort_by(|a, b| b.avg_score.total_cmp(&a.avg_score));
    clusters.truncate(options.max_clusters);

    let unclustered = grouping
        .unclustered
        .iter()
        .take(MAX_UNCLUSTERED)
        .map(|&index| items[index].clone())
        .collect();

    ClusterReport {
        clusters,
        unclustered,
        total_clustered,
    }
}
