//! Deal Hunter API Server
//!
//! HTTP API over the opportunity service and the ensemble estimator.

mod routes;

use axum::{
    http::{header, Method},
    Router,
};
use deal_core::DealConfig;
use deal_pricing::EnsemblePricer;
use deal_services::{bootstrap, DealService};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub deal_service: Arc<DealService>,
    pub ensemble: Arc<EnsemblePricer>,
    pub deal_threshold: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,deal_api=debug,tower_http=info")),
        )
        .init();

    info!("Starting Deal Hunter API");

    let config = DealConfig::from_env()?;
    if config.pushover.is_none() {
        info!("No Pushover credentials found - alerts will only be logged");
    }

    let ensemble = Arc::new(bootstrap::ensemble_pricer(&config)?);
    let deal_service = Arc::new(bootstrap::deal_service(&config, ensemble.clone())?);

    if config.pipeline.scan_interval_secs > 0 {
        Arc::clone(&deal_service)
            .spawn_timer(Duration::from_secs(config.pipeline.scan_interval_secs));
    } else {
        info!("Periodic scanning disabled (SCAN_INTERVAL_SECS=0)");
    }

    let state = AppState {
        deal_service,
        ensemble,
        deal_threshold: config.pipeline.deal_threshold,
    };

    // Configure CORS for the operator UI
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.pipeline.server_port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
