//! EV Battery-Module Assembly Dashboard
//!
//! Backend core for the assembly-line analytics dashboard:
//! - Parameter space: bounded, step-quantized process parameters
//! - Scenarios: validated what-if / optimizer requests and the prediction gateway
//! - Analytics: concurrent, periodically refreshed resources with per-resource state
//! - A JSON API that the presentation layer reads

pub mod analytics;
pub mod config;
pub mod error;
pub mod events;
pub mod parameters;
pub mod scenario;
pub mod server;
pub mod telemetry;

// Re-exports for convenience
pub use analytics::{AnalyticsAggregator, DashboardSnapshot, ResourceKind};
pub use config::DashboardConfig;
pub use events::{DashboardEvent, EventBus};
pub use parameters::ParameterSpaceRegistry;
pub use scenario::{ScenarioRequest, ScenarioRequestBuilder, ScenarioSession};
