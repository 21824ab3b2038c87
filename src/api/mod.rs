//! HTTP surface: read-only result queries and operator routes.

mod admin_routes;
mod query_routes;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;

use crate::admin::AdminService;
use crate::error::ModelError;
use crate::store::ResultStore;

pub use admin_routes::admin_routes;
pub use query_routes::query_routes;

/// Shared state for all routes.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn ResultStore>,
    pub admin: AdminService,
}

/// Full application router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .merge(query_routes(state.clone()))
        .merge(admin_routes(state))
}

/// Error body: `{"error": ..., "message": ...}`.
#[derive(Debug)]
pub enum ApiError {
    UnknownGame(ModelError),
    InvalidContest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        ApiError::UnknownGame(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::UnknownGame(e) => (StatusCode::NOT_FOUND, "unknown_game", e.to_string()),
            ApiError::InvalidContest(value) => (
                StatusCode::BAD_REQUEST,
                "invalid_contest",
                format!("'{value}' is not a contest number"),
            ),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "failed to read stored results".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}
