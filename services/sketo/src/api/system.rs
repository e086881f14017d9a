//! Liveness, readiness and version endpoints.
use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::types::{HealthStatus, NotReadyStatus, VersionInfo};
use crate::app::AppState;

pub(crate) async fn alive() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
    })
}

pub(crate) async fn ready(State(state): State<AppState>) -> Response {
    match state.repo.health_check() {
        Ok(()) => Json(HealthStatus {
            status: "ok".to_string(),
        })
        .into_response(),
        Err(err) => {
            let mut errors = BTreeMap::new();
            errors.insert("database".to_string(), err.to_string());
            (StatusCode::SERVICE_UNAVAILABLE, Json(NotReadyStatus { errors })).into_response()
        }
    }
}

pub(crate) async fn version() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
