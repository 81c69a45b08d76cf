use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, postgres::PgRow, types::Json};
use uuid::Uuid;

use super::PgCurationDao;
use crate::store::dao::traits::RuleDao;
use crate::store::models::{CurationActions, CurationCriteria, CurationRule, RuleDraft};

const RULE_COLUMNS: &str = "id, owner_id, name, is_active, criteria, actions, last_run, run_count, items_curated, created_at, updated_at";

fn rule_from_row(row: &PgRow) -> Result<CurationRule> {
    let criteria: Json<CurationCriteria> = row.try_get("criteria")?;
    let actions: Json<CurationActions> = row.try_get("actions")?;
    Ok(CurationRule {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        criteria: criteria.0,
        actions: actions.0,
        last_run: row.try_get("last_run")?,
        run_count: row.try_get("run_count")?,
        items_curated: row.try_get("items_curated")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl RuleDao for PgCurationDao {
    async fn insert_rule(&self, rule: &CurationRule) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO curation_rules
                (id, owner_id, name, is_active, criteria, actions, last_run, run_count, items_curated, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(rule.id)
        .bind(rule.owner_id)
        .bind(&rule.name)
        .bind(rule.is_active)
        .bind(Json(rule.criteria.clone()))
        .bind(Json(rule.actions.clone()))
        .bind(rule.last_run)
        .bind(rule.run_count)
        .bind(rule.items_curated)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await
        .context("failed to insert curation rule")?;
        Ok(())
    }

    async fn get_rule(&self, rule_id: Uuid) -> Result<Option<CurationRule>> {
        let row = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM curation_rules WHERE id = $1"
        ))
        .bind(rule_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch curation rule")?;
        row.as_ref().map(rule_from_row).transpose()
    }

    async fn list_rules(&self, owner_id: Uuid) -> Result<Vec<CurationRule>> {
        let rows = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM curation_rules WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list curation rules")?;
        rows.iter().map(rule_from_row).collect()
    }

    async fn list_active_rules(&self, owner_id: Uuid) -> Result<Vec<CurationRule>> {
        let rows = sqlx::query(&format!(
            "SELECT {RULE_COLUMNS} FROM curation_rules WHERE owner_id = $1 AND is_active ORDER BY created_at"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list active curation rules")?;
        rows.iter().map(rule_from_row).collect()
    }

    async fn owners_with_active_rules(&self) -> Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT DISTINCT owner_id FROM curation_rules WHERE is_active")
            .fetch_all(&self.pool)
            .await
            .context("failed to list owners with active rules")?;
        rows.iter()
            .map(|row| Ok(row.try_get::<Uuid, _>("owner_id")?))
            .collect()
    }

    async fn update_rule_config(
        &self,
        rule_id: Uuid,
        owner_id: Uuid,
        draft: &RuleDraft,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<CurationRule>> {
        let row = sqlx::query(&format!(
            r"
            UPDATE curation_rules
            SET name = $3, is_active = $4, criteria = $5, actions = $6, updated_at = $7
            WHERE id = $1 AND owner_id = $2
            RETURNING {RULE_COLUMNS}
            "
        ))
        .bind(rule_id)
        .bind(owner_id)
        .bind(&draft.name)
        .bind(draft.is_active)
        .bind(Json(draft.criteria.clone()))
        .bind(Json(draft.actions.clone()))
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await
        .context("failed to update curation rule")?;
        row.as_ref().map(rule_from_row).transpose()
    }

    async fn delete_rule(&self, rule_id: Uuid, owner_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM curation_rules WHERE id = $1 AND owner_id = $2")
            .bind(rule_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .context("failed to delete curation rule")?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_rule_run(
        &self,
        rule_id: Uuid,
        ran_at: DateTime<Utc>,
        items: i64,
    ) -> Result<Option<CurationRule>> {
        let row = sqlx::query(&format!(
            r"
            UPDATE curation_rules
            SET last_run = $2,
                run_count = run_count + 1,
                items_curated = items_curated + $3
            WHERE id = $1
            RETURNING {RULE_COLUMNS}
            "
        ))
        .bind(rule_id)
        .bind(ran_at)
        .bind(items)
        .fetch_optional(&self.pool)
        .await
        .context("failed to record rule run")?;
        row.as_ref().map(rule_from_row).transpose()
    }

    async fn swap_last_run(
        &self,
        rule_id: Uuid,
        expected: Option<DateTime<Utc>>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE curation_rules
            SET last_run = $3
            WHERE id = $1 AND last_run IS NOT DISTINCT FROM $2
            ",
        )
        .bind(rule_id)
        .bind(expected)
        .bind(next)
        .execute(&self.pool)
        .await
        .context("failed to swap rule last_run")?;
        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1 FROM curation_rules LIMIT 1")
            .execute(&self.pool)
            .await
            .context("rule store ping failed")?;
        Ok(())
    }
}
