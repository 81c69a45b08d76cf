use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, postgres::PgRow, types::Json};
use uuid::Uuid;

use super::PgCurationDao;
use crate::store::dao::traits::TemplateDao;
use crate::store::models::{CurationActions, CurationCriteria, CurationTemplate, TemplateDraft};

const TEMPLATE_COLUMNS: &str = "id, owner_id, name, description, is_public, criteria, actions, use_count, last_used, created_at, updated_at";

fn template_from_row(row: &PgRow) -> Result<CurationTemplate> {
    let criteria: Json<CurationCriteria> = row.try_get("criteria")?;
    let actions: Json<CurationActions> = row.try_get("actions")?;
    Ok(CurationTemplate {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        is_public: row.try_get("is_public")?,
        criteria: criteria.0,
        actions: actions.0,
        use_count: row.try_get("use_count")?,
        last_used: row.try_get("last_used")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TemplateDao for PgCurationDao {
    async fn insert_template(&self, template: &CurationTemplate) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO curation_templates
                (id, owner_id, name, description, is_public, criteria, actions, use_count, last_used, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(template.id)
        .bind(template.owner_id)
        .bind(&template.name)
        .bind(&template.description)
        .bind(template.is_public)
        .bind(Json(template.criteria.clone()))
        .bind(Json(template.actions.clone()))
        .bind(template.use_count)
        .bind(template.last_used)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await
        .context("failed to insert curation template")?;
        Ok(())
    }

    async fn get_template(&self, template_id: Uuid) -> Result<Option<CurationTemplate>> {
        let row = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM curation_templates WHERE id = $1"
        ))
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch curation template")?;
        row.as_ref().map(template_from_row).transpose()
    }

    async fn list_owner_templates(&self, owner_id: Uuid) -> Result<Vec<CurationTemplate>> {
        let rows = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM curation_templates WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list owner templates")?;
        rows.iter().map(template_from_row).collect()
    }

    async fn list_public_templates(&self, limit: usize) -> Result<Vec<CurationTemplate>> {
        let rows = sqlx::query(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM curation_templates WHERE is_public ORDER BY use_count DESC, created_at DESC LIMIT $1"
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .context("failed to list public templates")?;
        rows.iter().map(template_from_row).collect()
    }

    async fn update_template_config(
        &self,
        template_id: Uuid,
        owner_id: Uuid,
        draft: &TemplateDraft,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<CurationTemplate>> {
        let row = sqlx::query(&format!(
            r"
            UPDATE curation_templates
            SET name = $3, description = $4, is_public = $5, criteria = $6, actions = $7, updated_at = $8
            WHERE id = $1 AND owner_id = $2
            RETURNING {TEMPLATE_COLUMNS}
            "
        ))
        .bind(template_id)
        .bind(owner_id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.is_public)
        .bind(Json(draft.criteria.clone()))
        .bind(Json(draft.actions.clone()))
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await
        .context("failed to update curation template")?;
        row.as_ref().map(template_from_row).transpose()
    }

    async fn delete_template(&self, template_id: Uuid, owner_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM curation_templates WHERE id = $1 AND owner_id = $2")
                .bind(template_id)
                .bind(owner_id)
                .execute(&self.pool)
                .await
                .context("failed to delete curation template")?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_template_use(
        &self,
        template_id: Uuid,
        used_at: DateTime<Utc>,
    ) -> Result<Option<CurationTemplate>> {
        let row = sqlx::query(&format!(
            r"
            UPDATE curation_templates
            SET use_count = use_count + 1, last_used = $2
            WHERE id = $1
            RETURNING {TEMPLATE_COLUMNS}
            "
        ))
        .bind(template_id)
        .bind(used_at)
        .fetch_optional(&self.pool)
        .await
        .context("failed to record template use")?;
        row.as_ref().map(template_from_row).transpose()
    }
}
