//! Postgres-backed implementation of every DAO trait.
mod content;
mod rules;
mod templates;

use anyhow::{Context, Result};
use sqlx::{Executor, PgPool};

const SCHEMA: &str = include_str!("../../../migrations/0001_curation.sql");

#[derive(Debug, Clone)]
pub struct PgCurationDao {
    pool: PgPool,
}

impl PgCurationDao {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the bundled schema. Every statement is idempotent.
    ///
    /// # Errors
    /// Returns an error when the database rejects the schema.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.pool
            .execute(SCHEMA)
            .await
            .context("failed to apply curation schema")?;
        Ok(())
    }
}
