use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::saved::SaveError;
use crate::store::StoreError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg).into_response(),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg).into_response(),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Decode(msg) => {
                error!("store decode error: {msg}");
                ApiError::Internal("Unexpected response from data store".into())
            }
            other => {
                error!("store error: {other}");
                ApiError::Unavailable("Calendar data unavailable".into())
            }
        }
    }
}

impl From<SaveError> for ApiError {
    fn from(value: SaveError) -> Self {
        match value {
            SaveError::AlreadySaved { .. } => ApiError::Conflict(value.to_string()),
            SaveError::NotSaved { .. } => ApiError::NotFound(value.to_string()),
            SaveError::Store(err) => err.into(),
        }
    }
}
