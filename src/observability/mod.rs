pub mod metrics;
pub(crate) mod tracing;

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

use self::metrics::Metrics;

/// Metrics handle plus process-wide tracing setup.
#[derive(Debug, Clone)]
pub struct Telemetry {
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// Initialises tracing and registers metrics on a fresh registry.
    ///
    /// # Errors
    /// Fails when the subscriber cannot be installed or a metric cannot register.
    pub fn new() -> Result<Self> {
        tracing::init()?;
        Ok(Self::detached()?)
    }

    /// Metrics only; leaves the global subscriber alone.
    ///
    /// # Errors
    /// Fails when a metric cannot register.
    pub fn detached() -> Result<Self, prometheus::Error> {
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(registry)?);
        Ok(Self { metrics })
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn metrics_arc(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn record_ready_check(&self) {
        ::tracing::info!("service ready check recorded");
    }

    pub fn record_live_check(&self) {
        ::tracing::debug!("service live check");
    }

    /// Text exposition of this instance's registry.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.metrics.registry().gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).ok();
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_own_counters() {
        let telemetry = Telemetry::detached().expect("telemetry");
        telemetry.metrics().rules_executed.inc();
        let body = telemetry.render_prometheus();
        assert!(body.contains("curation_rules_executed_total 1"));
    }
}
