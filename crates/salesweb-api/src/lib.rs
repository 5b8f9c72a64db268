//! HTTP API server for period reports
//!
//! Routes are organized into modules:
//! - routes::reports: JSON reports, CSV downloads and the sales format

pub mod error;
pub mod routes;

use axum::{routing::get, Router};
use salesweb_config::Config;
use salesweb_core::ReportEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use error::{ApiError, ApiResult};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReportEngine>,
    pub config: Config,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::reports::{api_report, api_report_csv, api_sales_format};

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/reports/:kind", get(api_report))
        .route("/api/reports/:kind/csv", get(api_report_csv))
        .route("/api/reports/:kind/sales-format", get(api_sales_format))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Start the HTTP server
pub async fn start_server(config: Config, engine: Arc<ReportEngine>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let router = create_router(AppState { engine, config });

    let listener = TcpListener::bind(&addr).await?;
    log::info!(target: "salesweb::api", "Starting salesweb server on http://{}", addr);
    log::info!(target: "salesweb::api", "Available routes:");
    log::info!(target: "salesweb::api", "  - /api/health");
    log::info!(target: "salesweb::api", "  - /api/reports/{{payments,referrals}}");
    log::info!(target: "salesweb::api", "  - /api/reports/{{payments,referrals}}/csv");
    log::info!(target: "salesweb::api", "  - /api/reports/{{payments,referrals}}/sales-format");

    axum::serve(listener, router).await?;
    log::info!(target: "salesweb::api", "Server stopped gracefully");
    Ok(())
}
