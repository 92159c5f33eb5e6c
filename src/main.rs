//! EV Battery-Module Assembly Dashboard
//!
//! Keeps the analytics resources fresh in the background and serves them,
//! together with the what-if / optimizer scenario tool, as a JSON API.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use assembly_dashboard::analytics::{AnalyticsAggregator, HttpResourceFetcher};
use assembly_dashboard::config::DashboardConfig;
use assembly_dashboard::events::EventBus;
use assembly_dashboard::parameters::ParameterSpaceRegistry;
use assembly_dashboard::scenario::{HttpPredictionGateway, ScenarioSession};
use assembly_dashboard::server::{serve, AppState};
use assembly_dashboard::telemetry::init_telemetry;

// ──────────────────────────────────────────────────────────────────────────────
// MAIN ENTRY POINT
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DASHBOARD_CONFIG").ok())
        .map(PathBuf::from);
    let config = DashboardConfig::load(config_path.as_deref())
        .await
        .context("Failed to load configuration")?;

    let _telemetry = init_telemetry("assembly_dashboard", config.log_dir.as_deref())?;
    info!(api = %config.api_base_url, interval_secs = config.refresh_interval_secs, "Configuration loaded");

    let events = EventBus::default();
    let registry = Arc::new(ParameterSpaceRegistry::assembly_line());

    let fetcher = Arc::new(HttpResourceFetcher::new(&config.api_base_url, config.request_timeout())?);
    let aggregator = Arc::new(AnalyticsAggregator::new(fetcher, config.refresh_policy(), events.clone()));

    let gateway = Arc::new(HttpPredictionGateway::new(config.prediction_url(), config.request_timeout())?);
    let session = Arc::new(ScenarioSession::new(gateway, events.clone()));

    aggregator.start().await;

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_addr))?;
    let state = AppState {
        registry,
        aggregator: aggregator.clone(),
        session,
        events,
    };

    let served = serve(state, addr, shutdown_signal()).await;
    aggregator.stop().await;
    info!("Dashboard stopped");
    served
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown requested");
}
