//! JSON HTTP API.
//!
//! The router exposes the four pipeline operations plus read and delete
//! endpoints over the store. Every error body has the shape
//! `{"error": "<message>"}`.

pub mod handlers;
pub mod middleware;

use crate::error::{PipelineError, StoreError};
use crate::pipeline::TranslationPipeline;
use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TranslationPipeline>,
    pub allowed_origins: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(pipeline: Arc<TranslationPipeline>, allowed_origins: Vec<String>) -> Self {
        Self {
            pipeline,
            allowed_origins: Arc::new(allowed_origins),
        }
    }
}

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// The request itself couldn't be decoded.
    BadRequest(String),
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Pipeline(PipelineError::Persistence(err))
    }
}

/// Maps a pipeline error onto its HTTP status.
pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Validation(_) | PipelineError::Adapter(_) => StatusCode::BAD_REQUEST,
        PipelineError::LockBusy => StatusCode::CONFLICT,
        PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
        PipelineError::Fetch(_) | PipelineError::Provider(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Pipeline(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    error!(status = status.as_u16(), error = %err, "request failed");
                }
                (status, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Builds the application router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/stats/novels", get(handlers::stats))
        .route("/sources", get(handlers::sources))
        .route("/novels", get(handlers::list_novels))
        .route("/search/novels/:query", get(handlers::search_novels))
        .route(
            "/novels/:id",
            get(handlers::get_novel).delete(handlers::delete_novel),
        )
        .route("/novels/:id/chapters", get(handlers::list_chapters))
        .route(
            "/novels/:id/chapters/num/:number",
            get(handlers::read_chapter),
        )
        .route("/novels/translate", post(handlers::extract_novel))
        .route(
            "/novels/translate/first_chapter",
            post(handlers::translate_first_chapter),
        )
        .route("/novels/translate/chapter", post(handlers::translate_chapter))
        .route("/novels/refresh", post(handlers::refresh_novel))
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn_with_state(state.clone(), middleware::cors))
        .layer(from_fn(middleware::request_logging))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, ProviderError};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PipelineError::Validation("url is required".into()), 400),
            (PipelineError::Adapter("unknown source: x".into()), 400),
            (PipelineError::LockBusy, 409),
            (PipelineError::NotFound("novel n not found".into()), 404),
            (PipelineError::Fetch(FetchError::InvalidUrl("x".into())), 502),
            (PipelineError::Provider(ProviderError::Refused("no".into())), 502),
            (PipelineError::Persistence(StoreError::Poisoned), 500),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err).as_u16(), status, "{err}");
        }
    }

    #[test]
    fn test_lock_busy_message() {
        let response = ApiError::from(PipelineError::LockBusy).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
