use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{sse::{Event, Sse}, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::analytics::{AnalyticsAggregator, DashboardSnapshot};
use crate::error::{PredictionError, ScenarioError, ScenarioResult};
use crate::events::EventBus;
use crate::parameters::ParameterSpaceRegistry;
use crate::scenario::{parse_form_inputs, PredictionResult, ScenarioRequestBuilder, ScenarioSession, ScenarioView};

/// Errors mapped onto HTTP statuses for the presentation layer
pub enum ApiError {
    Scenario(ScenarioError),
    Prediction(PredictionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Scenario(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Prediction(PredictionError::Superseded) => {
                (StatusCode::CONFLICT, PredictionError::Superseded.to_string())
            }
            ApiError::Prediction(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<ScenarioError> for ApiError {
    fn from(err: ScenarioError) -> Self {
        ApiError::Scenario(err)
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        ApiError::Prediction(err)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ParameterSpaceRegistry>,
    pub aggregator: Arc<AnalyticsAggregator>,
    pub session: Arc<ScenarioSession>,
    pub events: EventBus,
}

/// A submitted field: a slider number or the raw text of a form input
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

/// Body of `POST /api/scenario`; `optimize` selects optimizer mode
#[derive(Debug, Deserialize)]
pub struct ScenarioSubmission {
    #[serde(default)]
    pub values: HashMap<String, FieldValue>,
    #[serde(default)]
    pub optimize: Option<String>,
}

impl ScenarioSubmission {
    /// Numeric values, with text fields parsed and blank ones left out.
    pub fn numeric_values(&self) -> ScenarioResult<HashMap<String, f64>> {
        let mut text = HashMap::new();
        let mut values = HashMap::with_capacity(self.values.len());
        for (key, field) in &self.values {
            match field {
                FieldValue::Number(n) => {
                    values.insert(key.clone(), *n);
                }
                FieldValue::Text(input) => {
                    text.insert(key.clone(), input.clone());
                }
            }
        }
        values.extend(parse_form_inputs(&text)?);
        Ok(values)
    }
}

#[derive(Debug, Serialize)]
struct ParameterDescriptor<'a> {
    key: &'a str,
    label: String,
    minimum: f64,
    maximum: f64,
    step: f64,
    unit: &'a str,
    default: f64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/parameters", get(parameters))
        .route("/api/analytics", get(analytics))
        .route("/api/scenario", get(scenario_view).post(submit_scenario))
        .route("/api/events", get(events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the dashboard API until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Dashboard API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn parameters(State(state): State<AppState>) -> impl IntoResponse {
    let descriptors: Vec<ParameterDescriptor<'_>> = state
        .registry
        .definitions()
        .iter()
        .map(|def| ParameterDescriptor {
            key: def.key(),
            label: def.display_label(),
            minimum: def.minimum(),
            maximum: def.maximum(),
            step: def.step(),
            unit: def.unit(),
            default: def.default_value(),
        })
        .collect();
    Json(serde_json::json!({ "parameters": descriptors }))
}

async fn analytics(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    Json(state.aggregator.snapshot())
}

async fn scenario_view(State(state): State<AppState>) -> Json<ScenarioView> {
    Json(state.session.view())
}

async fn submit_scenario(
    State(state): State<AppState>,
    Json(submission): Json<ScenarioSubmission>,
) -> Result<Json<PredictionResult>, ApiError> {
    let values = submission.numeric_values()?;
    let request = {
        let builder = ScenarioRequestBuilder::new(&state.registry);
        match submission.optimize.as_deref() {
            Some(target) => builder.build_optimize(target, &values)?,
            None => builder.build_what_if(&values)?,
        }
    };
    debug!(mode = ?request.mode(), "Scenario request accepted");

    let result = state.session.submit(request).await?;
    Ok(Json(result))
}

async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let mut rx = state.events.subscribe();
    let (sse_tx, sse_rx) = tokio::sync::mpsc::unbounded_channel::<Result<Event, Infallible>>();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let Ok(data) = serde_json::to_string(&event) else { continue };
                    if sse_tx.send(Ok(Event::default().data(data))).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "SSE subscriber lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    Sse::new(tokio_stream::wrappers::UnboundedReceiverStream::new(sse_rx))
}
