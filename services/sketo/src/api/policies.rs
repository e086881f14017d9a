//! Policy CRUD handlers.
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};

use crate::api::error::ApiError;
use crate::api::types::{ImportSummary, PolicyListQuery};
use crate::api::{decode_json, parse_flavor, parse_limit, parse_offset};
use crate::app::AppState;
use crate::model::Policy;

pub(crate) async fn list_policies(
    State(state): State<AppState>,
    Path(flavor): Path<String>,
    Query(query): Query<PolicyListQuery>,
) -> Result<Json<Vec<Policy>>, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    let offset = parse_offset(query.offset.as_ref())?;
    let limit = parse_limit(query.limit.as_ref())?;
    let policies = state.repo.list_policies(
        flavor,
        query.subject.as_deref().unwrap_or_default(),
        query.resource.as_deref().unwrap_or_default(),
        query.action.as_deref().unwrap_or_default(),
        offset,
        limit,
    )?;
    Ok(Json(policies))
}

pub(crate) async fn upsert_policy(
    State(state): State<AppState>,
    Path(flavor): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Policy>, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    let policy: Policy = decode_json(&headers, &body)?;
    let stored = state.repo.upsert_policy(flavor, policy)?;
    Ok(Json(stored))
}

pub(crate) async fn upsert_policies(
    State(state): State<AppState>,
    Path(flavor): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImportSummary>, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    let policies: Vec<Policy> = decode_json(&headers, &body)?;
    let stored = state.repo.upsert_policies(flavor, policies)?;
    Ok(Json(ImportSummary {
        total_imported: stored.len(),
    }))
}

pub(crate) async fn get_policy(
    State(state): State<AppState>,
    Path((flavor, id)): Path<(String, String)>,
) -> Result<Json<Policy>, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    Ok(Json(state.repo.get_policy(flavor, &id)?))
}

pub(crate) async fn delete_policy(
    State(state): State<AppState>,
    Path((flavor, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    state.repo.delete_policy(flavor, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
