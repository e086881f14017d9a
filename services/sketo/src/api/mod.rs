//! HTTP API module: route handlers and the small helpers they share.
//!
//! Mutating JSON endpoints (and `allowed`) demand an exact
//! `Content-Type: application/json`; anything else is a 400 with a
//! diagnostic body. Numeric query parameters are parsed by hand so the
//! diagnostics stay stable.
pub mod allowed;
pub mod data;
pub mod error;
pub mod policies;
pub mod roles;
pub mod system;
pub mod types;

use axum::http::HeaderMap;
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use sketo_match::Flavor;

use crate::api::error::{ApiError, bad_request, not_found};

/// Parse the `{flavor}` path segment. An unknown flavor behaves like an
/// unmatched route.
pub(crate) fn parse_flavor(raw: &str) -> Result<Flavor, ApiError> {
    raw.parse().map_err(|_| not_found())
}

pub(crate) fn require_json(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if content_type != "application/json" {
        return Err(bad_request(format!(
            "Bad request (content type \"{content_type}\" not allowed on this endpoint; only \"application/json\" is valid)"
        )));
    }
    Ok(())
}

/// Enforce the content type, then decode the body.
pub(crate) fn decode_json<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<T, ApiError> {
    require_json(headers)?;
    serde_json::from_slice(body).map_err(|_| bad_request("Couldn't decode body\n"))
}

pub(crate) fn parse_offset(raw: Option<&String>) -> Result<i64, ApiError> {
    match raw {
        None => Ok(0),
        Some(value) => value
            .parse()
            .map_err(|_| bad_request("Invalid offset query param\n")),
    }
}

pub(crate) fn parse_limit(raw: Option<&String>) -> Result<i64, ApiError> {
    match raw {
        None => Ok(-1),
        Some(value) => value
            .parse()
            .map_err(|_| bad_request("Invalid limit query param\n")),
    }
}
