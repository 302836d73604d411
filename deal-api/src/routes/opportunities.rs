//! Opportunity table, manual scans and re-notification

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use deal_core::DealError;
use tracing::{error, info};

use super::error_response;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/opportunities", get(list_opportunities))
        .route("/opportunities/{index}/notify", post(notify_opportunity))
        .route("/scan", post(run_scan))
}

/// Every opportunity surfaced so far, oldest first
async fn list_opportunities(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.deal_service.table().await)
}

/// Re-send the alert for a table row
async fn notify_opportunity(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    match state.deal_service.notify_row(index).await {
        Ok(opportunity) => (StatusCode::OK, Json(opportunity.row())).into_response(),
        Err(DealError::NotFound(msg)) => error_response(StatusCode::NOT_FOUND, msg).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e).into_response(),
    }
}

/// Run a scan cycle now; responds with the new opportunity or null
async fn run_scan(State(state): State<AppState>) -> impl IntoResponse {
    info!("Manual scan requested");
    match state.deal_service.run_cycle().await {
        Ok(found) => (StatusCode::OK, Json(found.map(|o| o.row()))).into_response(),
        Err(e) => {
            error!("Manual scan failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, e).into_response()
        }
    }
}
