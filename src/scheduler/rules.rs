//! Rule CRUD, single-rule execution and per-owner batch execution.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::gating::should_run;
use crate::curation::{CurationEngine, CurationOutcome};
use crate::observability::metrics::Metrics;
use crate::store::dao::RuleDao;
use crate::store::models::{CurationRule, CurationSource, RuleDraft};
use crate::util::error::CurationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleRunStatus {
    Completed,
    /// Not due yet according to its interval.
    Skipped,
    Inactive,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleExecution {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub status: RuleRunStatus,
    pub executed: bool,
    pub curated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RuleExecution {
    fn not_run(rule: &CurationRule, status: RuleRunStatus) -> Self {
        Self {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            status,
            executed: false,
            curated: 0,
            scheduled: None,
            message: None,
            error: None,
        }
    }

    fn completed(rule: &CurationRule, outcome: CurationOutcome) -> Self {
        Self {
            status: RuleRunStatus::Completed,
            executed: true,
            curated: outcome.curated,
            scheduled: outcome.scheduled,
            message: outcome.message,
            ..Self::not_run(rule, RuleRunStatus::Completed)
        }
    }

    fn failed(rule: &CurationRule, error: &anyhow::Error) -> Self {
        Self {
            error: Some(format!("{error:#}")),
            ..Self::not_run(rule, RuleRunStatus::Failed)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchExecution {
    /// Rules that completed.
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<RuleExecution>,
}

#[derive(Clone)]
pub struct RuleScheduler {
    rules: Arc<dyn RuleDao>,
    engine: CurationEngine,
    metrics: Arc<Metrics>,
}

impl RuleScheduler {
    pub fn new(engine: CurationEngine, metrics: Arc<Metrics>) -> Self {
        Self {
            rules: Arc::clone(&engine.stores().rules),
            engine,
            metrics,
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// # Errors
    /// `Validation` for out-of-range configuration; store failures otherwise.
    pub async fn create_rule(&self, owner_id: Uuid, draft: RuleDraft) -> Result<CurationRule> {
        draft.validate()?;
        let now = Utc::now();
        let rule = CurationRule {
            id: Uuid::new_v4(),
            owner_id,
            name: draft.name,
            is_active: draft.is_active,
            criteria: draft.criteria,
            actions: draft.actions,
            last_run: None,
            run_count: 0,
            items_curated: 0,
            created_at: now,
            updated_at: now,
        };
        self.rules
            .insert_rule(&rule)
            .await
            .context("failed to insert curation rule")?;
        info!(owner_id = %owner_id, rule_id = %rule.id, name = %rule.name, "curation rule created");
        Ok(rule)
    }

    pub async fn list_rules(&self, owner_id: Uuid) -> Result<Vec<CurationRule>> {
        self.rules
            .list_rules(owner_id)
            .await
            .context("failed to list curation rules")
    }

    /// # Errors
    /// `NotFound` when the rule is absent or owned by someone else.
    pub async fn get_rule(&self, owner_id: Uuid, rule_id: Uuid) -> Result<CurationRule> {
        self.rules
            .get_rule(rule_id)
            .await
            .context("failed to load curation rule")?
            .filter(|rule| rule.owner_id == owner_id)
            .ok_or_else(|| CurationError::rule_not_found(rule_id).into())
    }

    /// Replaces name, activity, criteria and actions. Run statistics are kept.
    ///
    /// # Errors
    /// `Validation` or `NotFound`.
    pub async fn update_rule(&self, owner_id: Uuid, rule_id: Uuid, draft: RuleDraft) -> Result<CurationRule> {
        draft.validate()?;
        let updated = self
            .rules
            .update_rule_config(rule_id, owner_id, &draft, Utc::now())
            .await
            .context("failed to update curation rule")?
            .ok_or(CurationError::rule_not_found(rule_id))?;
        info!(owner_id = %owner_id, rule_id = %rule_id, "curation rule updated");
        Ok(updated)
    }

    /// # Errors
    /// `NotFound` when nothing was deleted.
    pub async fn delete_rule(&self, owner_id: Uuid, rule_id: Uuid) -> Result<()> {
        let deleted = self
            .rules
            .delete_rule(rule_id, owner_id)
            .await
            .context("failed to delete curation rule")?;
        if !deleted {
            return Err(CurationError::rule_not_found(rule_id).into());
        }
        info!(owner_id = %owner_id, rule_id = %rule_id, "curation rule deleted");
        Ok(())
    }

    /// Runs one rule regardless of its interval. Inactive rules are a no-op.
    ///
    /// # Errors
    /// `NotFound` when the rule does not exist; discovery and store failures.
    pub async fn execute_rule(&self, rule_id: Uuid) -> Result<RuleExecution> {
        let rule = self
            .rules
            .get_rule(rule_id)
            .await
            .context("failed to load curation rule")?
            .ok_or(CurationError::rule_not_found(rule_id))?;
        self.execute_loaded(&rule).await
    }

    /// [`Self::execute_rule`] restricted to rules owned by `owner_id`.
    ///
    /// # Errors
    /// See [`Self::execute_rule`].
    pub async fn execute_owned_rule(&self, owner_id: Uuid, rule_id: Uuid) -> Result<RuleExecution> {
        let rule = self.get_rule(owner_id, rule_id).await?;
        self.execute_loaded(&rule).await
    }

    async fn execute_loaded(&self, rule: &CurationRule) -> Result<RuleExecution> {
        if !rule.is_active {
            info!(rule_id = %rule.id, "curation rule inactive, nothing to execute");
            return Ok(RuleExecution::not_run(rule, RuleRunStatus::Inactive));
        }
        self.run(rule).await
    }

    /// Executes every due active rule of `owner_id` in sequence. A failing rule
    /// is recorded in its own entry and the batch carries on. A rule claimed by
    /// a concurrent batch counts as skipped.
    ///
    /// # Errors
    /// Only when the active rules cannot be listed.
    pub async fn execute_all_active(&self, owner_id: Uuid) -> Result<BatchExecution> {
        let rules = self
            .rules
            .list_active_rules(owner_id)
            .await
            .context("failed to list active curation rules")?;

        let mut batch = BatchExecution::default();
        for rule in &rules {
            let execution = self.execute_due(rule, Utc::now()).await;
            match execution.status {
                RuleRunStatus::Completed => batch.executed += 1,
                RuleRunStatus::Failed => batch.failed += 1,
                RuleRunStatus::Skipped | RuleRunStatus::Inactive => batch.skipped += 1,
            }
            batch.results.push(execution);
        }

        info!(
            owner_id = %owner_id,
            executed = batch.executed,
            skipped = batch.skipped,
            failed = batch.failed,
            "active curation rules processed"
        );
        Ok(batch)
    }

    /// Runs `rule` if it is due at `now`. The run is claimed first by moving
    /// `last_run` from the value this copy of the rule carries to `now`, so
    /// two overlapping batches never execute the same rule twice. A failed run
    /// hands the previous `last_run` back.
    async fn execute_due(&self, rule: &CurationRule, now: DateTime<Utc>) -> RuleExecution {
        if !should_run(rule, now) {
            self.metrics.rules_skipped.inc();
            return RuleExecution::not_run(rule, RuleRunStatus::Skipped);
        }

        // Postgres keeps microseconds; the stored claim must compare equal later.
        let claimed_at = now.trunc_subsecs(6);
        match self.rules.swap_last_run(rule.id, rule.last_run, Some(claimed_at)).await {
            Ok(true) => {}
            Ok(false) => {
                info!(rule_id = %rule.id, "curation rule already claimed by another run");
                self.metrics.rules_skipped.inc();
                return RuleExecution::not_run(rule, RuleRunStatus::Skipped);
            }
            Err(error) => {
                return self.record_failure(rule, &error.context("failed to claim curation rule run"));
            }
        }

        match self.run(rule).await {
            Ok(execution) => execution,
            Err(error) => {
                if let Err(release) = self
                    .rules
                    .swap_last_run(rule.id, Some(claimed_at), rule.last_run)
                    .await
                {
                    warn!(rule_id = %rule.id, error = %format!("{release:#}"), "failed to release rule claim");
                }
                self.record_failure(rule, &error)
            }
        }
    }

    fn record_failure(&self, rule: &CurationRule, error: &anyhow::Error) -> RuleExecution {
        error!(
            owner_id = %rule.owner_id,
            rule_id = %rule.id,
            error = %format!("{error:#}"),
            "curation rule failed"
        );
        self.metrics.rules_failed.inc();
        RuleExecution::failed(rule, error)
    }

    async fn run(&self, rule: &CurationRule) -> Result<RuleExecution> {
        let started = Instant::now();
        let outcome = self
            .engine
            .run_configured(
                rule.owner_id,
                &rule.criteria,
                &rule.actions,
                Some(CurationSource::Rule(rule.id)),
            )
            .await
            .with_context(|| format!("failed to execute curation rule {}", rule.id))?;

        let curated = i64::try_from(outcome.curated).unwrap_or(i64::MAX);
        let recorded = self
            .rules
            .record_rule_run(rule.id, Utc::now(), curated)
            .await
            .context("failed to record rule run")?;
        if recorded.is_none() {
            warn!(rule_id = %rule.id, "rule disappeared before its run could be recorded");
        }

        self.metrics.rules_executed.inc();
        self.metrics
            .rule_execution_duration
            .observe(started.elapsed().as_secs_f64());
        info!(
            owner_id = %rule.owner_id,
            rule_id = %rule.id,
            curated = outcome.curated,
            scheduled = outcome.scheduled.unwrap_or(0),
            "curation rule executed"
        );
        Ok(RuleExecution::completed(rule, outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::NoopAdvisor;
    use crate::curation::EngineSettings;
    use crate::store::dao::{InMemoryStore, Stores};
    use crate::store::models::{
        ContentItem, ContentStatus, ContentType, CurationActions, CurationCriteria, ScheduleInterval,
    };
    use crate::util::error::{ErrorKind, classify_error};
    use chrono::Duration;

    struct Fixture {
        scheduler: RuleScheduler,
        store: Arc<InMemoryStore>,
        owner: Uuid,
    }

    async fn fixture() -> Fixture {
        let owner = Uuid::new_v4();
        let store = Arc::new(InMemoryStore::new());
        for index in 0..4 {
            store
                .insert_content(ContentItem {
                    id: Uuid::new_v4(),
                    owner_id: owner,
                    content_type: ContentType::Video,
                    category: None,
                    tags: vec!["launch".into()],
                    title: Some(format!("Product launch recap {index}")),
                    description: Some("Everything we shipped this month and what comes next for users.".into()),
                    has_media: true,
                    status: ContentStatus::Completed,
                    created_at: Utc::now() - Duration::days(1),
                })
                .await;
        }
        let metrics = Arc::new(Metrics::standalone().expect("metrics"));
        let engine = CurationEngine::new(
            Stores::from_backend(store.clone()),
            Arc::new(NoopAdvisor),
            Arc::clone(&metrics),
            EngineSettings::default(),
        );
        Fixture {
            scheduler: RuleScheduler::new(engine, metrics),
            store,
            owner,
        }
    }

    fn draft(name: &str, interval: ScheduleInterval) -> RuleDraft {
        RuleDraft {
            name: name.into(),
            is_active: true,
            criteria: CurationCriteria {
                min_score: 10.0,
                ..CurationCriteria::default()
            },
            actions: CurationActions {
                auto_schedule: true,
                schedule_interval: interval,
                max_items: 3,
                platforms: vec!["twitter".into()],
                ..CurationActions::default()
            },
        }
    }

    #[tokio::test]
    async fn execute_rule_updates_stats_and_schedules() {
        let f = fixture().await;
        let rule = f
            .scheduler
            .create_rule(f.owner, draft("weekly launches", ScheduleInterval::Weekly))
            .await
            .expect("create");

        let execution = f.scheduler.execute_rule(rule.id).await.expect("execute");
        assert_eq!(execution.status, RuleRunStatus::Completed);
        assert!(execution.executed);
        assert_eq!(execution.curated, 3);
        assert_eq!(execution.scheduled, Some(3));

        let stored = f.scheduler.get_rule(f.owner, rule.id).await.expect("rule");
        assert_eq!(stored.run_count, 1);
        assert_eq!(stored.items_curated, 3);
        assert!(stored.last_run.is_some());

        let posts = f.store.scheduled_posts().await;
        assert_eq!(posts.len(), 3);
        assert!(posts
            .iter()
            .all(|post| post.curation_source == Some(CurationSource::Rule(rule.id))));
    }

    #[tokio::test]
    async fn inactive_rule_is_a_no_op() {
        let f = fixture().await;
        let mut paused = draft("paused", ScheduleInterval::Daily);
        paused.is_active = false;
        let rule = f.scheduler.create_rule(f.owner, paused).await.expect("create");

        let execution = f.scheduler.execute_rule(rule.id).await.expect("execute");
        assert_eq!(execution.status, RuleRunStatus::Inactive);
        assert!(!execution.executed);
        let stored = f.scheduler.get_rule(f.owner, rule.id).await.expect("rule");
        assert_eq!(stored.run_count, 0);
    }

    #[tokio::test]
    async fn unknown_rule_is_not_found() {
        let f = fixture().await;
        let error = f
            .scheduler
            .execute_rule(Uuid::new_v4())
            .await
            .expect_err("missing rule");
        assert_eq!(classify_error(&error), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn batch_skips_rules_that_are_not_due() {
        let f = fixture().await;
        let daily = f
            .scheduler
            .create_rule(f.owner, draft("daily", ScheduleInterval::Daily))
            .await
            .expect("create");
        f.scheduler.execute_rule(daily.id).await.expect("first run");
        f.scheduler
            .create_rule(f.owner, draft("fresh", ScheduleInterval::Daily))
            .await
            .expect("create");

        let batch = f.scheduler.execute_all_active(f.owner).await.expect("batch");

        assert_eq!(batch.executed, 1);
        assert_eq!(batch.skipped, 1);
        let skipped = batch
            .results
            .iter()
            .find(|entry| entry.rule_id == daily.id)
            .expect("daily entry");
        assert_eq!(skipped.status, RuleRunStatus::Skipped);
    }

    #[tokio::test]
    async fn update_keeps_run_statistics_and_validates() {
        let f = fixture().await;
        let rule = f
            .scheduler
            .create_rule(f.owner, draft("evergreen", ScheduleInterval::Monthly))
            .await
            .expect("create");
        f.scheduler.execute_rule(rule.id).await.expect("run");

        let mut renamed = draft("evergreen v2", ScheduleInterval::Weekly);
        renamed.actions.max_items = 5;
        let updated = f
            .scheduler
            .update_rule(f.owner, rule.id, renamed.clone())
            .await
            .expect("update");
        assert_eq!(updated.name, "evergreen v2");
        assert_eq!(updated.run_count, 1);
        assert_eq!(updated.items_curated, 3);

        renamed.actions.max_items = 0;
        let error = f
            .scheduler
            .update_rule(f.owner, rule.id, renamed)
            .await
            .expect_err("invalid");
        assert_eq!(classify_error(&error), ErrorKind::Invalid);

        let stranger = f
            .scheduler
            .delete_rule(Uuid::new_v4(), rule.id)
            .await
            .expect_err("not owned");
        assert_eq!(classify_error(&stranger), ErrorKind::NotFound);
        f.scheduler.delete_rule(f.owner, rule.id).await.expect("delete");
        assert!(f.scheduler.list_rules(f.owner).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn stale_rule_copy_does_not_run_twice() {
        let f = fixture().await;
        let rule = f
            .scheduler
            .create_rule(f.owner, draft("daily stale", ScheduleInterval::Daily))
            .await
            .expect("create");

        let first = f.scheduler.execute_due(&rule, Utc::now()).await;
        assert_eq!(first.status, RuleRunStatus::Completed);
        let second = f.scheduler.execute_due(&rule, Utc::now()).await;
        assert_eq!(second.status, RuleRunStatus::Skipped);

        let stored = f.scheduler.get_rule(f.owner, rule.id).await.expect("rule");
        assert_eq!(stored.run_count, 1);
        assert_eq!(f.store.scheduled_posts().await.len(), 3);
    }

    #[tokio::test]
    async fn overlapping_batches_execute_each_rule_once() {
        let f = fixture().await;
        let rule = f
            .scheduler
            .create_rule(f.owner, draft("daily", ScheduleInterval::Daily))
            .await
            .expect("create");

        let (left, right) = tokio::join!(
            f.scheduler.execute_all_active(f.owner),
            f.scheduler.execute_all_active(f.owner)
        );
        let (left, right) = (left.expect("left batch"), right.expect("right batch"));

        assert_eq!(left.executed + right.executed, 1);
        assert_eq!(left.skipped + right.skipped, 1);
        let stored = f.scheduler.get_rule(f.owner, rule.id).await.expect("rule");
        assert_eq!(stored.run_count, 1);
        assert_eq!(f.store.scheduled_posts().await.len(), 3);
    }
}
