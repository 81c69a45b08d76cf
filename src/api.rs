pub(crate) mod curation;
pub(crate) mod error;
pub(crate) mod health;
pub(crate) mod metrics;
pub(crate) mod owner;
pub(crate) mod rules;
pub(crate) mod templates;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/v1/curation/score/{content_id}", post(curation::score))
        .route("/v1/curation/discover", post(curation::discover))
        .route("/v1/curation/auto-curate", post(curation::auto_curate))
        .route("/v1/curation/insights", get(curation::insights))
        .route("/v1/curation/batch", post(curation::batch))
        .route("/v1/curation/feed", get(curation::feed))
        .route("/v1/curation/similar/{content_id}", get(curation::similar))
        .route("/v1/curation/cluster", post(curation::cluster))
        .route("/v1/curation/freshness/{content_id}", get(curation::freshness))
        .route("/v1/curation/predict/{content_id}", get(curation::predict))
        .route("/v1/curation/gaps", get(curation::gaps))
        .route("/v1/curation/optimize-schedule", post(curation::optimize_schedule))
        .route("/v1/curation/rules", get(rules::list).post(rules::create))
        .route("/v1/curation/rules/execute-all", post(rules::execute_all))
        .route("/v1/curation/rules/{id}", put(rules::update).delete(rules::delete))
        .route("/v1/curation/rules/{id}/execute", post(rules::execute))
        .route("/v1/curation/templates", get(templates::list).post(templates::create))
        .route("/v1/curation/templates/public", get(templates::list_public))
        .route(
            "/v1/curation/templates/{id}",
            put(templates::update).delete(templates::delete),
        )
        .route("/v1/curation/templates/{id}/use", post(templates::use_template))
        .route("/v1/curation/templates/{id}/duplicate", post(templates::duplicate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, Bytes, to_bytes},
        extract::{Path, State},
        http::{Method, Request, StatusCode, header},
    };
    use chrono::{Duration, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::owner::{OWNER_HEADER, OwnerId};
    use super::{curation, rules};
    use crate::app::{AppState, ComponentRegistry, build_router};
    use crate::clients::NoopAdvisor;
    use crate::curation::EngineSettings;
    use crate::observability::Telemetry;
    use crate::store::dao::{InMemoryStore, Stores};
    use crate::store::models::{ContentItem, ContentStatus, ContentType};

    fn registry(store: &Arc<InMemoryStore>) -> ComponentRegistry {
        ComponentRegistry::from_stores(
            Stores::from_backend(Arc::clone(store)),
            Arc::new(NoopAdvisor),
            Telemetry::detached().expect("telemetry"),
            EngineSettings::default(),
        )
    }

    fn app() -> (Router, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (build_router(registry(&store)), store)
    }

    fn assert_send<T: Send>(_: T) {}

    fn content(owner_id: Uuid, title: &str, tags: &[&str]) -> ContentItem {
        ContentItem {
            id: Uuid::new_v4(),
            owner_id,
            content_type: ContentType::Video,
            category: Some("Fitness".into()),
            tags: tags.iter().map(ToString::to_string).collect(),
            title: Some(title.into()),
            description: Some(
                "A complete walkthrough with every step explained for people starting out".into(),
            ),
            has_media: true,
            status: ContentStatus::Completed,
            created_at: Utc::now() - Duration::days(2),
        }
    }

    fn request(method: Method, uri: &str, owner: Option<Uuid>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            builder = builder.header(OWNER_HEADER, owner.to_string());
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_endpoints_respond() {
        let (router, _) = app();
        let (status, body) = send(&router, request(Method::GET, "/health/live", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "live");
        assert_eq!(body["service"], "curation-engine");

        let (status, body) = send(&router, request(Method::GET, "/health/ready", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        let checks = body["checks"].as_array().expect("checks");
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(|check| check["ok"] == true));
        assert_eq!(checks[1]["store"], "rules");
    }

    #[test]
    fn handler_futures_are_send() {
        let state = AppState::new(registry(&Arc::new(InMemoryStore::new())));
        let owner = OwnerId(Uuid::new_v4());
        assert_send(curation::discover(State(state.clone()), owner, Bytes::new()));
        assert_send(curation::predict(State(state.clone()), owner, Path(Uuid::new_v4())));
        assert_send(rules::execute_all(State(state), owner));
    }

    #[tokio::test]
    async fn oversized_period_is_bad_request() {
        let (router, _) = app();
        let owner = Uuid::new_v4();
        for uri in ["/v1/curation/gaps?period=100000000", "/v1/curation/insights?period=3651"] {
            let (status, body) = send(&router, request(Method::GET, uri, Some(owner), None)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].as_str().unwrap_or_default().contains("period"));
        }
        let (status, _) = send(
            &router,
            request(Method::GET, "/v1/curation/gaps?period=3650", Some(owner), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn predict_endpoint_reports_score_without_history() {
        let (router, store) = app();
        let owner = Uuid::new_v4();
        let item = content(owner, "Mobility routine for desk workers", &["mobility"]);
        let item_id = item.id;
        store.insert_content(item).await;

        let uri = format!("/v1/curation/predict/{item_id}");
        let (status, body) = send(&router, request(Method::GET, &uri, Some(owner), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content_id"], item_id.to_string());
        assert!(body["curation_score"].as_f64().is_some());
        assert!(body["predicted_performance"].is_null());

        let (status, _) = send(&router, request(Method::GET, &uri, Some(Uuid::new_v4()), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_owner_header_is_unauthorized() {
        let (router, _) = app();
        let (status, body) = send(&router, request(Method::POST, "/v1/curation/discover", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "missing x-owner-id header");
    }

    #[tokio::test]
    async fn score_endpoint_scores_owned_content_only() {
        let (router, store) = app();
        let owner = Uuid::new_v4();
        let item = content(owner, "Full body workout for beginners at home", &["fitness", "workout"]);
        let item_id = item.id;
        store.insert_content(item).await;

        let uri = format!("/v1/curation/score/{item_id}");
        let (status, body) = send(&router, request(Method::POST, &uri, Some(owner), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["max_score"], 100.0);
        assert!(body["grade"].is_string());

        let (status, _) = send(&router, request(Method::POST, &uri, Some(Uuid::new_v4()), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_score_options_are_rejected() {
        let (router, store) = app();
        let owner = Uuid::new_v4();
        let item = content(owner, "Stretching basics", &["fitness"]);
        let uri = format!("/v1/curation/score/{}", item.id);
        store.insert_content(item).await;

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(&uri)
                    .header(OWNER_HEADER, owner.to_string())
                    .body(Body::from("{not json"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_with_no_ids_is_bad_request() {
        let (router, _) = app();
        let (status, body) = send(
            &router,
            request(
                Method::POST,
                "/v1/curation/batch",
                Some(Uuid::new_v4()),
                Some(json!({ "content_ids": [] })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap_or_default().contains("content_ids"));
    }

    #[tokio::test]
    async fn feed_rejects_unknown_content_type() {
        let (router, _) = app();
        let (status, _) = send(
            &router,
            request(
                Method::GET,
                "/v1/curation/feed?content_types=video,hologram",
                Some(Uuid::new_v4()),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rule_lifecycle_over_http() {
        let (router, _) = app();
        let owner = Uuid::new_v4();
        let (status, created) = send(
            &router,
            request(
                Method::POST,
                "/v1/curation/rules",
                Some(owner),
                Some(json!({ "name": "Weekly best", "is_active": true })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let rule_id = created["id"].as_str().expect("rule id").to_string();

        let (status, listed) = send(&router, request(Method::GET, "/v1/curation/rules", Some(owner), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));

        let execute = format!("/v1/curation/rules/{rule_id}/execute");
        let (status, _) = send(&router, request(Method::POST, &execute, Some(Uuid::new_v4()), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, ran) = send(&router, request(Method::POST, &execute, Some(owner), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ran["curated"], 0);

        let (status, batch) = send(
            &router,
            request(Method::POST, "/v1/curation/rules/execute-all", Some(owner), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(batch["failed"], 0);

        let delete = format!("/v1/curation/rules/{rule_id}");
        let (status, _) = send(&router, request(Method::DELETE, &delete, Some(owner), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&router, request(Method::DELETE, &delete, Some(owner), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn foreign_public_template_cannot_be_updated() {
        let (router, _) = app();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let (status, created) = send(
            &router,
            request(
                Method::POST,
                "/v1/curation/templates",
                Some(owner),
                Some(json!({ "name": "Evergreen", "is_public": true })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let template_id = created["id"].as_str().expect("template id").to_string();

        let (status, _) = send(
            &router,
            request(
                Method::PUT,
                &format!("/v1/curation/templates/{template_id}"),
                Some(stranger),
                Some(json!({ "name": "Mine now", "is_public": true })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, public) = send(
            &router,
            request(Method::GET, "/v1/curation/templates/public?limit=5", Some(stranger), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(public.as_array().map(Vec::len), Some(1));

        let (status, copy) = send(
            &router,
            request(
                Method::POST,
                &format!("/v1/curation/templates/{template_id}/duplicate"),
                Some(stranger),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(copy["name"], "Evergreen (Copy)");
        assert_eq!(copy["is_public"], false);
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_registry() {
        let (router, _) = app();
        let owner = Uuid::new_v4();
        send(&router, request(Method::POST, "/v1/curation/discover", Some(owner), None)).await;

        let response = router
            .clone()
            .oneshot(request(Method::GET, "/metrics", None, None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            prometheus::TEXT_FORMAT
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(text.contains("curation_discovery_runs_total 1"));
    }
}
