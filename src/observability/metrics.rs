/// Prometheus metric definitions.
use prometheus::{
    Counter, Gauge, Histogram, Registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    // counters
    pub items_scored: Counter,
    pub discovery_runs: Counter,
    pub rules_executed: Counter,
    pub rules_failed: Counter,
    pub rules_skipped: Counter,
    pub posts_scheduled: Counter,
    pub templates_used: Counter,
    pub advisor_fallbacks: Counter,

    // histograms
    pub discovery_duration: Histogram,
    pub rule_execution_duration: Histogram,

    // gauges
    pub owners_in_flight: Gauge,
}

impl Metrics {
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            items_scored: register_counter_with_registry!(
                "curation_items_scored_total",
                "Total number of content items scored",
                registry
            )?,
            discovery_runs: register_counter_with_registry!(
                "curation_discovery_runs_total",
                "Total number of discovery runs",
                registry
            )?,
            rules_executed: register_counter_with_registry!(
                "curation_rules_executed_total",
                "Total number of curation rules executed to completion",
                registry
            )?,
            rules_failed: register_counter_with_registry!(
                "curation_rules_failed_total",
                "Total number of curation rule executions that failed",
                registry
            )?,
            rules_skipped: register_counter_with_registry!(
                "curation_rules_skipped_total",
                "Total number of curation rules skipped by interval gating",
                registry
            )?,
            posts_scheduled: register_counter_with_registry!(
                "curation_posts_scheduled_total",
                "Total number of scheduled posts created",
                registry
            )?,
            templates_used: register_counter_with_registry!(
                "curation_templates_used_total",
                "Total number of template invocations",
                registry
            )?,
            advisor_fallbacks: register_counter_with_registry!(
                "curation_advisor_fallbacks_total",
                "Schedule slots that fell back to default hours",
                registry
            )?,
            discovery_duration: register_histogram_with_registry!(
                "curation_discovery_duration_seconds",
                "Duration of discovery runs",
                registry
            )?,
            rule_execution_duration: register_histogram_with_registry!(
                "curation_rule_execution_duration_seconds",
                "Duration of single rule executions",
                registry
            )?,
            owners_in_flight: register_gauge_with_registry!(
                "curation_daemon_owners_in_flight",
                "Owners currently processed by the rule daemon",
                registry
            )?,
            registry,
        })
    }

    /// Metrics on a private registry, for tests and embedded use.
    pub fn standalone() -> Result<Self, prometheus::Error> {
        Self::new(Arc::new(Registry::new()))
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_registries_do_not_collide() {
        let first = Metrics::standalone().expect("first");
        let second = Metrics::standalone().expect("second");
        first.items_scored.inc_by(3.0);
        assert!((second.items_scored.get()).abs() < f64::EPSILON);
        assert!((first.items_scored.get() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Arc::new(Registry::new());
        let _first = Metrics::new(Arc::clone(&registry)).expect("first");
        assert!(Metrics::new(registry).is_err());
    }
}
