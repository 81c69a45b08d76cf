use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder, Row, postgres::PgRow, types::Json};
use uuid::Uuid;

use super::PgCurationDao;
use crate::store::dao::traits::{ContentDao, EngagementDao, ProfileDao, SchedulingDao};
use crate::store::models::{
    ContentFilter, ContentItem, ContentStatus, ContentType, EngagementRecord, OwnerProfile,
    ScheduledPostRecord,
};

const CONTENT_COLUMNS: &str = "id, owner_id, content_type, category, tags, title, description, has_media, status, created_at";

fn content_from_row(row: &PgRow) -> Result<ContentItem> {
    let content_type: String = row.try_get("content_type")?;
    let status: String = row.try_get("status")?;
    Ok(ContentItem {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        content_type: ContentType::parse(&content_type)
            .with_context(|| format!("unknown content_type in store: {content_type}"))?,
        category: row.try_get("category")?,
        tags: row.try_get("tags")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        has_media: row.try_get("has_media")?,
        status: ContentStatus::parse(&status)
            .with_context(|| format!("unknown content status in store: {status}"))?,
        created_at: row.try_get("created_at")?,
    })
}

fn engagement_from_row(row: &PgRow) -> Result<EngagementRecord> {
    Ok(EngagementRecord {
        content_id: row.try_get("content_id")?,
        platform: row.try_get("platform")?,
        engagement: row.try_get("engagement")?,
        posted_at: row.try_get("posted_at")?,
    })
}

const ENGAGEMENT_SELECT: &str = r"
    SELECT content_id, platform, COALESCE(engagement, 0) AS engagement, posted_at
    FROM scheduled_posts
    WHERE owner_id = $1
      AND status = 'posted'
      AND posted_at IS NOT NULL
";

#[async_trait]
impl ContentDao for PgCurationDao {
    async fn find_content(
        &self,
        owner_id: Uuid,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items WHERE owner_id = "
        ));
        builder.push_bind(owner_id);

        if let Some(ids) = &filter.ids {
            builder.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
        }
        if !filter.exclude_ids.is_empty() {
            builder
                .push(" AND NOT (id = ANY(")
                .push_bind(filter.exclude_ids.clone())
                .push("))");
        }
        if !filter.statuses.is_empty() {
            let statuses: Vec<String> = filter
                .statuses
                .iter()
                .map(|status| status.as_str().to_string())
                .collect();
            builder.push(" AND status = ANY(").push_bind(statuses).push(")");
        }
        if !filter.content_types.is_empty() {
            let types: Vec<String> = filter
                .content_types
                .iter()
                .map(|kind| kind.as_str().to_string())
                .collect();
            builder.push(" AND content_type = ANY(").push_bind(types).push(")");
        }
        if !filter.tags.is_empty() {
            builder.push(" AND tags && ").push_bind(filter.tags.clone());
        }
        if !filter.exclude_tags.is_empty() {
            let excluded: Vec<String> = filter
                .exclude_tags
                .iter()
                .map(|tag| tag.to_lowercase())
                .collect();
            builder
                .push(" AND NOT EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE lower(tag) = ANY(")
                .push_bind(excluded)
                .push("))");
        }
        if let Some(range) = filter.created_range {
            if let Some(start) = range.start {
                builder.push(" AND created_at >= ").push_bind(start);
            }
            if let Some(end) = range.end {
                builder.push(" AND created_at <= ").push_bind(end);
            }
        }
        builder.push(" ORDER BY created_at, id");
        if let Some(limit) = filter.limit {
            builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .context("failed to query content_items")?;
        rows.iter().map(content_from_row).collect()
    }

    async fn find_content_by_id(
        &self,
        owner_id: Uuid,
        content_id: Uuid,
    ) -> Result<Option<ContentItem>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = $1 AND owner_id = $2"
        ))
        .bind(content_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch content item")?;
        row.as_ref().map(content_from_row).transpose()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("store ping failed")?;
        Ok(())
    }
}

#[async_trait]
impl EngagementDao for PgCurationDao {
    async fn find_by_content_ids(
        &self,
        owner_id: Uuid,
        content_ids: &[Uuid],
    ) -> Result<Vec<EngagementRecord>> {
        if content_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!("{ENGAGEMENT_SELECT} AND content_id = ANY($2)"))
            .bind(owner_id)
            .bind(content_ids)
            .fetch_all(&self.pool)
            .await
            .context("failed to batch-fetch engagement history")?;
        rows.iter().map(engagement_from_row).collect()
    }

    async fn find_most_recent_posted(
        &self,
        owner_id: Uuid,
        content_id: Uuid,
    ) -> Result<Option<EngagementRecord>> {
        let row = sqlx::query(&format!(
            "{ENGAGEMENT_SELECT} AND content_id = $2 ORDER BY posted_at DESC LIMIT 1"
        ))
        .bind(owner_id)
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch most recent posted record")?;
        row.as_ref().map(engagement_from_row).transpose()
    }

    async fn find_posted_since(
        &self,
        owner_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<EngagementRecord>> {
        let rows = sqlx::query(&format!("{ENGAGEMENT_SELECT} AND posted_at >= $2"))
            .bind(owner_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .context("failed to fetch posted records for period")?;
        rows.iter().map(engagement_from_row).collect()
    }
}

#[async_trait]
impl ProfileDao for PgCurationDao {
    async fn get_profile(&self, owner_id: Uuid) -> Result<Option<OwnerProfile>> {
        let row = sqlx::query(
            r"
            SELECT owner_id, niche, preference_tags
            FROM owner_profiles
            WHERE owner_id = $1
            ",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch owner profile")?;

        row.map(|row| {
            Ok(OwnerProfile {
                owner_id: row.try_get("owner_id")?,
                niche: row.try_get("niche")?,
                preference_tags: row.try_get("preference_tags")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl SchedulingDao for PgCurationDao {
    async fn insert_scheduled_posts(&self, records: &[ScheduledPostRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO scheduled_posts (id, owner_id, content_id, platform, scheduled_time, status, title, description, content_type, curation_source) ",
        );
        builder.push_values(records, |mut row, record| {
            row.push_bind(record.id)
                .push_bind(record.owner_id)
                .push_bind(record.content_id)
                .push_bind(record.platform.clone())
                .push_bind(record.scheduled_time)
                .push_bind(record.status.clone())
                .push_bind(record.title.clone())
                .push_bind(record.description.clone())
                .push_bind(record.content_type.as_str())
                .push_bind(record.curation_source.map(Json));
        });

        builder
            .build()
            .execute(&self.pool)
            .await
            .context("failed to insert scheduled posts")?;
        Ok(())
    }
}
