//! Ad hoc price estimates

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde::Deserialize;
use tracing::error;

use super::error_response;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/estimate", post(estimate))
}

#[derive(Debug, Deserialize)]
struct EstimateRequest {
    description: String,
}

/// Ensemble estimate with every component
async fn estimate(
    State(state): State<AppState>,
    Json(request): Json<EstimateRequest>,
) -> impl IntoResponse {
    let description = request.description.trim();
    if description.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "description must not be empty").into_response();
    }

    match state.ensemble.estimate(description).await {
        Ok(estimate) => (StatusCode::OK, Json(estimate)).into_response(),
        Err(e) => {
            error!("Estimate failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, e).into_response()
        }
    }
}
