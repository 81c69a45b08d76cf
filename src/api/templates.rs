use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

use super::curation::optional_body;
use super::error::ApiResult;
use super::owner::OwnerId;
use crate::app::AppState;
use crate::store::models::{CurationTemplate, TemplateDraft};
use crate::templates::{DEFAULT_PUBLIC_LIMIT, TemplateUse};

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    include_public: bool,
}

pub(crate) async fn list(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<CurationTemplate>>> {
    Ok(Json(
        state
            .templates()
            .list_for_owner(owner_id, query.include_public)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublicQuery {
    limit: Option<usize>,
}

pub(crate) async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<PublicQuery>,
) -> ApiResult<Json<Vec<CurationTemplate>>> {
    let limit = query.limit.unwrap_or(DEFAULT_PUBLIC_LIMIT);
    Ok(Json(state.templates().list_public(limit).await?))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Json(draft): Json<TemplateDraft>,
) -> ApiResult<(StatusCode, Json<CurationTemplate>)> {
    let template = state.templates().create(owner_id, draft).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(template_id): Path<Uuid>,
    Json(draft): Json<TemplateDraft>,
) -> ApiResult<Json<CurationTemplate>> {
    Ok(Json(state.templates().update(owner_id, template_id, draft).await?))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(template_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.templates().delete(owner_id, template_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn use_template(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(template_id): Path<Uuid>,
) -> ApiResult<Json<TemplateUse>> {
    Ok(Json(state.templates().use_template(owner_id, template_id).await?))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DuplicateRequest {
    #[serde(default)]
    name: Option<String>,
}

pub(crate) async fn duplicate(
    State(state): State<AppState>,
    OwnerId(owner_id): OwnerId,
    Path(template_id): Path<Uuid>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CurationTemplate>)> {
    let request: DuplicateRequest = optional_body(&body)?;
    let copy = state
        .templates()
        .duplicate(owner_id, template_id, request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(copy)))
}
