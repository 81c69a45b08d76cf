//! Client for the posting-time advisor.
//!
//! The advisor ranks hours of day by historical performance for an owner and
//! platform. It is best-effort: callers fall back to default hours on error.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait PerformanceAdvisor: Send + Sync {
    /// Best hours (0-23) for posting on `platform` on `date`, best first.
    /// An empty list means the advisor has no data.
    async fn optimal_hours(&self, owner_id: Uuid, platform: &str, date: NaiveDate) -> Result<Vec<i64>>;
}

/// Advisor used when no endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAdvisor;

#[async_trait]
impl PerformanceAdvisor for NoopAdvisor {
    async fn optimal_hours(&self, _owner_id: Uuid, _platform: &str, _date: NaiveDate) -> Result<Vec<i64>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct OptimalHoursResponse {
    #[serde(default)]
    best_hours: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct HttpPerformanceAdvisor {
    client: Client,
    base_url: Url,
}

impl HttpPerformanceAdvisor {
    /// # Errors
    /// Returns an error when the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .context("failed to build performance advisor HTTP client")?;
        let base_url = Url::parse(base_url).context("invalid performance advisor base URL")?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl PerformanceAdvisor for HttpPerformanceAdvisor {
    async fn optimal_hours(&self, owner_id: Uuid, platform: &str, date: NaiveDate) -> Result<Vec<i64>> {
        let mut url = self
            .base_url
            .join("v1/optimal-hours")
            .context("failed to build optimal hours URL")?;
        url.query_pairs_mut()
            .append_pair("owner_id", &owner_id.to_string())
            .append_pair("platform", platform)
            .append_pair("date", &date.format("%Y-%m-%d").to_string());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("performance advisor request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("performance advisor returned error status {status}: {body}");
        }

        let payload: OptimalHoursResponse = response
            .json()
            .await
            .context("failed to deserialize optimal hours response")?;
        debug!(%owner_id, platform, hours = payload.best_hours.len(), "fetched optimal hours");
        Ok(payload.best_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
    }

    #[tokio::test]
    async fn returns_ranked_hours() {
        let server = MockServer::start().await;
        let owner_id = Uuid::new_v4();

        Mock::given(method("GET"))
            .and(path("/v1/optimal-hours"))
            .and(query_param("owner_id", owner_id.to_string()))
            .and(query_param("platform", "twitter"))
            .and(query_param("date", "2026-03-02"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "best_hours": [18, 12, 8] })),
            )
            .mount(&server)
            .await;

        let advisor = HttpPerformanceAdvisor::new(&server.uri(), Duration::from_secs(2))
            .expect("client builds");
        let hours = advisor
            .optimal_hours(owner_id, "twitter", date())
            .await
            .expect("hours fetched");

        assert_eq!(hours, vec![18, 12, 8]);
    }

    #[tokio::test]
    async fn missing_hours_field_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/optimal-hours"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let advisor = HttpPerformanceAdvisor::new(&server.uri(), Duration::from_secs(2))
            .expect("client builds");
        let hours = advisor
            .optimal_hours(Uuid::new_v4(), "linkedin", date())
            .await
            .expect("hours fetched");
        assert!(hours.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/optimal-hours"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .mount(&server)
            .await;

        let advisor = HttpPerformanceAdvisor::new(&server.uri(), Duration::from_secs(2))
            .expect("client builds");
        let error = advisor
            .optimal_hours(Uuid::new_v4(), "twitter", date())
            .await
            .expect_err("503 must fail");
        assert!(error.to_string().contains("503"));
    }

    #[tokio::test]
    async fn noop_has_no_data() {
        let hours = NoopAdvisor
            .optimal_hours(Uuid::new_v4(), "twitter", date())
            .await
            .expect("noop never fails");
        assert!(hours.is_empty());
    }
}
