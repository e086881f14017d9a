//! Store-wide maintenance endpoints: truncate everything, rebuild the
//! `exact` policy index.
use axum::extract::{Path, State};
use axum::http::StatusCode;
use sketo_match::Flavor;

use crate::api::error::{ApiError, not_found};
use crate::api::parse_flavor;
use crate::app::AppState;
use crate::counters;

pub(crate) async fn drop_everything(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.repo.drop_all()?;
    counters::reload(&state.repo)?;
    tracing::info!("dropped all documents and reloaded counters");
    Ok(StatusCode::OK)
}

pub(crate) async fn reindex(
    State(state): State<AppState>,
    Path(flavor): Path<String>,
) -> Result<StatusCode, ApiError> {
    // Only the exact flavor carries an index; any other flavor behaves
    // like an unmatched route.
    if parse_flavor(&flavor)? != Flavor::Exact {
        return Err(not_found());
    }
    let documents = state.repo.reindex_exact()?;
    tracing::info!(documents, "reindex complete");
    Ok(StatusCode::OK)
}
