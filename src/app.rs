use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::{
    api,
    clients::{HttpPerformanceAdvisor, NoopAdvisor, PerformanceAdvisor},
    config::Config,
    curation::{CurationEngine, EngineSettings, discovery::DiscoverySettings},
    observability::Telemetry,
    scheduler::RuleScheduler,
    store::dao::{PgCurationDao, RuleDao, Stores},
    templates::TemplateLibrary,
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    telemetry: Telemetry,
    engine: CurationEngine,
    rule_scheduler: RuleScheduler,
    template_library: TemplateLibrary,
    postgres: Option<Arc<PgCurationDao>>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn engine(&self) -> &CurationEngine {
        &self.registry.engine
    }

    pub(crate) fn rules(&self) -> &RuleScheduler {
        &self.registry.rule_scheduler
    }

    pub(crate) fn templates(&self) -> &TemplateLibrary {
        &self.registry.template_library
    }
}

/// Engine tuning derived from the environment.
fn engine_settings(config: &Config) -> EngineSettings {
    EngineSettings {
        discovery: DiscoverySettings {
            fetch_concurrency: config.fetch_concurrency().get(),
            engagement_batch_size: config.engagement_batch_size().get(),
            parallel_scoring_threshold: config.parallel_scoring_threshold(),
        },
        default_platforms: config.default_platforms().to_vec(),
    }
}

impl ComponentRegistry {
    /// Wires the Postgres store, the advisor client and every service on top.
    ///
    /// # Errors
    /// Fails when telemetry, the pool or the advisor client cannot be set up.
    pub fn build(config: &Config) -> Result<Self> {
        let telemetry = Telemetry::new()?;
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections())
            .acquire_timeout(config.db_acquire_timeout())
            .test_before_acquire(true)
            .connect_lazy(config.db_dsn())
            .context("failed to configure curation_db connection pool")?;
        let postgres = Arc::new(PgCurationDao::new(pool));

        let advisor: Arc<dyn PerformanceAdvisor> = match config.advisor_base_url() {
            Some(base_url) => {
                info!(%base_url, "performance advisor enabled");
                Arc::new(HttpPerformanceAdvisor::new(base_url, config.advisor_timeout())?)
            }
            None => {
                info!("performance advisor not configured; default hours will be used");
                Arc::new(NoopAdvisor)
            }
        };

        let mut registry = Self::from_stores(
            Stores::from_backend(Arc::clone(&postgres)),
            advisor,
            telemetry,
            engine_settings(config),
        );
        registry.postgres = Some(postgres);
        Ok(registry)
    }

    /// Assembles the services over arbitrary stores. Used by tests and local runs.
    #[must_use]
    pub fn from_stores(
        stores: Stores,
        advisor: Arc<dyn PerformanceAdvisor>,
        telemetry: Telemetry,
        settings: EngineSettings,
    ) -> Self {
        let metrics = telemetry.metrics_arc();
        let engine = CurationEngine::new(stores, advisor, Arc::clone(&metrics), settings);
        let rule_scheduler = RuleScheduler::new(engine.clone(), Arc::clone(&metrics));
        let template_library = TemplateLibrary::new(engine.clone(), metrics);
        Self {
            telemetry,
            engine,
            rule_scheduler,
            template_library,
            postgres: None,
        }
    }

    /// Applies the bundled schema when backed by Postgres.
    ///
    /// # Errors
    /// Propagates schema failures.
    pub async fn ensure_schema(&self) -> Result<()> {
        if let Some(postgres) = &self.postgres {
            postgres.ensure_schema().await?;
        }
        Ok(())
    }

    #[must_use]
    pub fn rule_scheduler(&self) -> &RuleScheduler {
        &self.rule_scheduler
    }

    #[must_use]
    pub fn rule_store(&self) -> Arc<dyn RuleDao> {
        Arc::clone(&self.engine.stores().rules)
    }

    #[must_use]
    pub fn engine(&self) -> &CurationEngine {
        &self.engine
    }

    #[must_use]
    pub fn templates(&self) -> &TemplateLibrary {
        &self.template_library
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let state = AppState::new(registry);
    api::router(state)
}
