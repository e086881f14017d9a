//! The decision endpoint.
//!
//! Counter discipline: every call that reaches a known flavor increments
//! `requests`, then exactly one of `accepted`, `refused` or `failures`
//! depending on how the call ends. Empty subject/resource/action is a
//! refusal, not an error.
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::api::types::{AllowedInput, AuthorizationResult};
use crate::api::{decode_json, parse_flavor};
use crate::app::AppState;
use crate::counters;
use crate::engine;

pub(crate) async fn allowed(
    State(state): State<AppState>,
    Path(flavor): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // An unknown flavor never reaches the handler logic, so it does not
    // count as a request.
    let flavor = match parse_flavor(&flavor) {
        Ok(flavor) => flavor,
        Err(err) => return err.into_response(),
    };
    counters::allow_requests().increment(1);

    let input: AllowedInput = match decode_json(&headers, &body) {
        Ok(input) => input,
        Err(err) => {
            counters::allow_failures().increment(1);
            return err.into_response();
        }
    };

    if input.subject.is_empty() || input.resource.is_empty() || input.action.is_empty() {
        counters::allow_refused().increment(1);
        return Json(AuthorizationResult { allowed: false }).into_response();
    }

    match engine::check(
        &state.repo,
        flavor,
        &input.subject,
        &input.resource,
        &input.action,
    ) {
        Ok(allowed) => {
            if allowed {
                counters::allow_accepted().increment(1);
            } else {
                counters::allow_refused().increment(1);
            }
            Json(AuthorizationResult { allowed }).into_response()
        }
        Err(err) => {
            counters::allow_failures().increment(1);
            crate::api::error::ApiError::from(err).into_response()
        }
    }
}
