use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::app::AppState;

const SERVICE: &str = "curation-engine";

/// Outcome of one store connectivity check.
#[derive(Debug, Serialize)]
pub(crate) struct StoreCheck {
    store: &'static str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StoreCheck {
    fn from_ping(store: &'static str, result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                store,
                ok: true,
                error: None,
            },
            Err(error) => {
                error!(store, error = %format!("{error:#}"), "store readiness check failed");
                Self {
                    store,
                    ok: false,
                    error: Some(format!("{error:#}")),
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthReport {
    service: &'static str,
    status: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    checks: Vec<StoreCheck>,
}

/// Ready once the content and rule stores both answer.
pub(crate) async fn ready(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    state.telemetry().record_ready_check();

    let stores = state.engine().stores();
    let (content, rules) = tokio::join!(stores.content.ping(), stores.rules.ping());
    let checks = vec![
        StoreCheck::from_ping("content", content),
        StoreCheck::from_ping("rules", rules),
    ];

    let (code, status) = if checks.iter().all(|check| check.ok) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    (
        code,
        Json(HealthReport {
            service: SERVICE,
            status,
            checks,
        }),
    )
}

pub(crate) async fn live(State(state): State<AppState>) -> Json<HealthReport> {
    state.telemetry().record_live_check();
    Json(HealthReport {
        service: SERVICE,
        status: "live",
        checks: Vec::new(),
    })
}
