//! API route definitions

mod estimate;
mod health;
mod opportunities;

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;
use axum::Router;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(opportunities::routes())
        .merge(estimate::routes())
        .merge(health::routes())
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
}

pub(crate) fn error_response(status: StatusCode, error: impl ToString) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}
