/// Scoring and clustering throughput over synthetic content.
use chrono::{Duration, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use uuid::Uuid;

use curation_engine::curation::clustering::{ClusterOptions, cluster_content};
use curation_engine::curation::scoring::{ScoreOptions, score_content};
use curation_engine::store::models::{
    ContentItem, ContentStatus, ContentType, EngagementRecord, OwnerProfile,
};

const TOPICS: [&str; 6] = ["fitness", "cooking", "travel", "finance", "gaming", "music"];

fn synthetic_items(count: usize) -> Vec<ContentItem> {
    let owner_id = Uuid::new_v4();
    let now = Utc::now();
    (0..count)
        .map(|index| {
            let topic = TOPICS[index % TOPICS.len()];
            ContentItem {
                id: Uuid::new_v4(),
                owner_id,
                content_type: if index % 2 == 0 {
                    ContentType::Video
                } else {
                    ContentType::Article
                },
                category: Some(topic.to_string()),
                tags: vec![topic.to_string(), format!("series-{}", index % 10), "weekly".into()],
                title: Some(format!("Weekly {topic} notes episode {}", index % 25)),
                description: Some(format!(
                    "Everything worth knowing about {topic} this week with links and follow-ups {}",
                    index % 7
                )),
                has_media: index % 3 == 0,
                status: ContentStatus::Completed,
                created_at: now - Duration::days(i64::try_from(index % 120).unwrap_or(0)),
            }
        })
        .collect()
}

fn bench_scoring(c: &mut Criterion) {
    let items = synthetic_items(1000);
    let now = Utc::now();
    let profile = OwnerProfile {
        owner_id: items[0].owner_id,
        niche: Some("fitness".into()),
        preference_tags: vec!["weekly".into(), "travel".into()],
    };
    let history: Vec<EngagementRecord> = items
        .iter()
        .step_by(4)
        .map(|item| EngagementRecord {
            content_id: item.id,
            platform: "twitter".into(),
            engagement: 120.0,
            posted_at: now - Duration::days(3),
        })
        .collect();
    let options = ScoreOptions::default();

    c.bench_function("score_1k_items", |b| {
        b.iter(|| {
            let total: f64 = items
                .iter()
                .map(|item| score_content(item, &history, Some(&profile), &options, now).total_score)
                .sum();
            black_box(total);
        });
    });
}

fn bench_clustering(c: &mut Criterion) {
    let items = synthetic_items(300);
    let options = ClusterOptions::default();

    c.bench_function("cluster_300_items", |b| {
        b.iter(|| {
            let report = cluster_content(&items, &options, |_| 50.0);
            black_box(report.total_clustered);
        });
    });
}

criterion_group!(benches, bench_scoring, bench_clustering);
criterion_main!(benches);
