//! HTTP error mapping.
//!
//! Bodies are short plain text, never backtraces: bad requests map to 400,
//! a missing primary document to 404, everything else (storage, codec,
//! pattern compilation) to 500.
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sketo_store::StoreError;

use crate::repo::RepoError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

pub fn not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: "Not found\n".to_string(),
    }
}

pub fn server_error() -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "Server error\n".to_string(),
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => not_found(),
            RepoError::Store(StoreError::OffsetTooLarge) => {
                bad_request(format!("{}\n", StoreError::OffsetTooLarge))
            }
            other => {
                tracing::error!(error = %other, "request failed");
                server_error()
            }
        }
    }
}
