use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::{sync::Semaphore, task::JoinHandle, time::sleep};
use tracing::{error, info};
use uuid::Uuid;

use super::rules::{BatchExecution, RuleScheduler};
use crate::store::dao::RuleDao;

/// Totals of one daemon tick across owners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub owners: usize,
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Owners whose rules could not be listed.
    pub owner_errors: usize,
}

pub fn spawn_rule_daemon(
    scheduler: RuleScheduler,
    rules: Arc<dyn RuleDao>,
    tick: Duration,
    owner_concurrency: NonZeroUsize,
) -> JoinHandle<()> {
    RuleDaemon::new(scheduler, rules, tick, owner_concurrency).spawn()
}

pub struct RuleDaemon {
    scheduler: RuleScheduler,
    rules: Arc<dyn RuleDao>,
    tick: Duration,
    owner_concurrency: NonZeroUsize,
}

impl RuleDaemon {
    pub fn new(
        scheduler: RuleScheduler,
        rules: Arc<dyn RuleDao>,
        tick: Duration,
        owner_concurrency: NonZeroUsize,
    ) -> Self {
        Self {
            scheduler,
            rules,
            tick,
            owner_concurrency,
        }
    }

    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        info!(tick_seconds = self.tick.as_secs(), "rule daemon started");
        loop {
            match self.tick_once().await {
                Ok(summary) => info!(
                    owners = summary.owners,
                    executed = summary.executed,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    owner_errors = summary.owner_errors,
                    "rule daemon tick completed"
                ),
                Err(err) => error!(error = %err, "rule daemon tick failed"),
            }
            sleep(self.tick).await;
        }
    }

    /// Runs every owner's due rules once, at most `owner_concurrency` owners
    /// at a time.
    ///
    /// # Errors
    /// Only when the owner list cannot be loaded; per-owner failures are counted.
    pub async fn tick_once(&self) -> Result<TickSummary> {
        let owners = self
            .rules
            .owners_with_active_rules()
            .await
            .context("failed to list owners with active rules")?;
        let permits = Arc::new(Semaphore::new(self.owner_concurrency.get()));
        let metrics = self.scheduler.metrics();

        let runs = owners.iter().map(|&owner_id| {
            let permits = Arc::clone(&permits);
            async move {
                let _permit = permits.acquire().await.context("owner semaphore closed")?;
                metrics.owners_in_flight.inc();
                let result = self.scheduler.execute_all_active(owner_id).await;
                metrics.owners_in_flight.dec();
                result.map(|batch| (owner_id, batch))
            }
        });
        let results: Vec<Result<(Uuid, BatchExecution)>> = join_all(runs).await;

        let mut summary = TickSummary {
            owners: owners.len(),
            ..TickSummary::default()
        };
        for result in results {
            match result {
                Ok((_, batch)) => {
                    summary.executed += batch.executed;
                    summary.skipped += batch.skipped;
                    summary.failed += batch.failed;
                }
                Err(err) => {
                    summary.owner_errors += 1;
                    error!(error = %format!("{err:#}"), "owner rule batch failed");
                }
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::NoopAdvisor;
    use crate::curation::{CurationEngine, EngineSettings};
    use crate::observability::metrics::Metrics;
    use crate::store::dao::{InMemoryStore, Stores};
    use crate::store::models::{CurationActions, CurationCriteria, RuleDraft, ScheduleInterval};

    #[tokio::test]
    async fn tick_runs_due_rules_for_every_owner() {
        let store = Arc::new(InMemoryStore::new());
        let stores = Stores::from_backend(store.clone());
        let metrics = Arc::new(Metrics::standalone().expect("metrics"));
        let engine = CurationEngine::new(
            stores.clone(),
            Arc::new(NoopAdvisor),
            Arc::clone(&metrics),
            EngineSettings::default(),
        );
        let scheduler = RuleScheduler::new(engine, metrics);

        let draft = RuleDraft {
            name: "daily picks".into(),
            is_active: true,
            criteria: CurationCriteria::default(),
            actions: CurationActions {
                schedule_interval: ScheduleInterval::Daily,
                ..CurationActions::default()
            },
        };
        for _ in 0..3 {
            scheduler
                .create_rule(Uuid::new_v4(), draft.clone())
                .await
                .expect("create");
        }

        let daemon = RuleDaemon::new(
            scheduler,
            stores.rules.clone(),
            Duration::from_secs(60),
            NonZeroUsize::new(2).expect("non-zero"),
        );

        let first = daemon.tick_once().await.expect("tick");
        assert_eq!(first.owners, 3);
        assert_eq!(first.executed, 3);

        // every rule ran moments ago, so nothing is due
        let second = daemon.tick_once().await.expect("tick");
        assert_eq!(second.executed, 0);
        assert_eq!(second.skipped, 3);
    }
}
