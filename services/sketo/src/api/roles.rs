//! Role CRUD and membership handlers.
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};

use crate::api::error::ApiError;
use crate::api::types::{AddMembersRequest, RoleListQuery};
use crate::api::{decode_json, parse_flavor, parse_limit, parse_offset, require_json};
use crate::app::AppState;
use crate::model::Role;

pub(crate) async fn list_roles(
    State(state): State<AppState>,
    Path(flavor): Path<String>,
    Query(query): Query<RoleListQuery>,
) -> Result<Json<Vec<Role>>, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    let offset = parse_offset(query.offset.as_ref())?;
    let limit = parse_limit(query.limit.as_ref())?;
    let roles = state.repo.list_roles(
        flavor,
        query.member.as_deref().unwrap_or_default(),
        offset,
        limit,
    )?;
    Ok(Json(roles))
}

pub(crate) async fn upsert_role(
    State(state): State<AppState>,
    Path(flavor): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Role>, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    let role: Role = decode_json(&headers, &body)?;
    let stored = state.repo.upsert_role(flavor, role)?;
    Ok(Json(stored))
}

pub(crate) async fn get_role(
    State(state): State<AppState>,
    Path((flavor, id)): Path<(String, String)>,
) -> Result<Json<Role>, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    Ok(Json(state.repo.get_role(flavor, &id)?))
}

pub(crate) async fn delete_role(
    State(state): State<AppState>,
    Path((flavor, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    state.repo.delete_role(flavor, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn add_members(
    State(state): State<AppState>,
    Path((flavor, id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Role>, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    let request: AddMembersRequest = decode_json(&headers, &body)?;
    let role = state.repo.add_members(flavor, &id, request.members)?;
    Ok(Json(role))
}

pub(crate) async fn remove_member(
    State(state): State<AppState>,
    Path((flavor, id, member)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Json<Role>, ApiError> {
    let flavor = parse_flavor(&flavor)?;
    require_json(&headers)?;
    let role = state.repo.remove_member(flavor, &id, &member)?;
    Ok(Json(role))
}
