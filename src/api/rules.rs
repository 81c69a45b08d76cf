use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::error::ApiResult;
use super::owner::OwnerId;
use crate::app::AppState;
use crate::scheduler::{BatchExecution, RuleExecution};
use crate::store::models::{CurationRule, RuleDraft};

pub(crate) async fn list(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> ApiResult<Json<Vec<CurationRule>>> {
    Ok(Json(state.rules().list_rules(owner_id).await?))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(draft): Json<RuleDraft>,
) -> ApiResult<(StatusCode, Json<CurationRule>)> {
    let rule = state.rules().create_rule(owner_id, draft).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(rule_id): Path<Uuid>,
    Json(draft): Json<RuleDraft>,
) -> ApiResult<Json<CurationRule>> {
    Ok(Json(state.rules().update_rule(owner_id, rule_id, draft).await?))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(rule_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.rules().delete_rule(owner_id, rule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn execute(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(rule_id): Path<Uuid>,
) -> ApiResult<Json<RuleExecution>> {
    Ok(Json(state.rules().execute_owned_rule(owner_id, rule_id).await?))
}

pub(crate) async fn execute_all(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
) -> ApiResult<Json<BatchExecution>> {
    Ok(Json(state.rules().execute_all_active(owner_id).await?))
}
