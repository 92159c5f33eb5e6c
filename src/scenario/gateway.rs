//! Prediction Gateway
//!
//! Sends a validated scenario to the external prediction service and turns
//! the reply into a typed [`PredictionResult`]. One outbound call per
//! submission; no retries, no caching.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ScenarioMode, ScenarioRequest};
use crate::error::{GatewayResult, PredictionError};

/// Predicted outcome of one scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    defect_probability: BTreeMap<String, f64>,
    efficiency_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    optimal_value: Option<f64>,
}

impl PredictionResult {
    pub fn new(defect_probability: BTreeMap<String, f64>, efficiency_score: f64, optimal_value: Option<f64>) -> Self {
        Self {
            defect_probability,
            efficiency_score,
            optimal_value,
        }
    }

    /// Count or probability per defect-severity label
    pub fn defect_probability(&self) -> &BTreeMap<String, f64> {
        &self.defect_probability
    }

    pub fn efficiency_score(&self) -> f64 {
        self.efficiency_score
    }

    /// Solved value of the free parameter; only present for optimizer requests
    pub fn optimal_value(&self) -> Option<f64> {
        self.optimal_value
    }
}

/// Anything that can evaluate a scenario
#[async_trait]
pub trait PredictionGateway: Send + Sync {
    /// Evaluate one scenario. Dropping the returned future abandons the call.
    async fn submit(&self, request: &ScenarioRequest) -> GatewayResult<PredictionResult>;
}

/// Request body sent to the prediction service
#[derive(Debug, Serialize)]
struct PredictionPayload<'a> {
    mode: &'static str,
    inputs: BTreeMap<&'a str, f64>,
    optimize_param: Option<&'a str>,
}

impl<'a> From<&'a ScenarioRequest> for PredictionPayload<'a> {
    fn from(request: &'a ScenarioRequest) -> Self {
        let mode = match request.mode() {
            ScenarioMode::WhatIf => "what_if",
            ScenarioMode::Optimize { .. } => "optimize",
        };
        Self {
            mode,
            inputs: request.fixed_values().iter().map(|v| (v.key(), v.value())).collect(),
            optimize_param: request.optimize_target(),
        }
    }
}

/// Decode a prediction service reply for `request`.
///
/// Expected shape:
/// `{"optimal_value": n?, "predicted_outcome": {"defect_probability": {label: n}, "efficiency_score": n}}`
pub fn decode_prediction(request: &ScenarioRequest, body: &Value) -> GatewayResult<PredictionResult> {
    let invalid = |msg: &str| PredictionError::InvalidResponse(msg.to_string());

    let outcome = body
        .get("predicted_outcome")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("missing predicted_outcome"))?;

    let efficiency_score = outcome
        .get("efficiency_score")
        .and_then(Value::as_f64)
        .filter(|score| score.is_finite())
        .ok_or_else(|| invalid("missing or non-numeric efficiency_score"))?;

    let raw_defects = outcome
        .get("defect_probability")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("missing defect_probability"))?;

    let mut defect_probability = BTreeMap::new();
    for (label, value) in raw_defects {
        let value = value
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| PredictionError::InvalidResponse(format!("defect entry {} is not a non-negative number", label)))?;
        defect_probability.insert(label.clone(), value);
    }

    let optimal_value = match request.mode() {
        ScenarioMode::WhatIf => None,
        ScenarioMode::Optimize { .. } => Some(
            body.get("optimal_value")
                .and_then(Value::as_f64)
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid("optimizer reply without numeric optimal_value"))?,
        ),
    };

    Ok(PredictionResult::new(defect_probability, efficiency_score, optimal_value))
}

/// Prediction service reached over HTTP with a JSON body
pub struct HttpPredictionGateway {
    client: Client,
    endpoint: String,
}

impl HttpPredictionGateway {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build prediction HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PredictionGateway for HttpPredictionGateway {
    async fn submit(&self, request: &ScenarioRequest) -> GatewayResult<PredictionResult> {
        let payload = PredictionPayload::from(request);
        debug!(endpoint = %self.endpoint, mode = payload.mode, "Submitting scenario");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("Prediction service call failed: {}", e);
                PredictionError::ServiceUnavailable(e.to_string())
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PredictionError::ServiceUnavailable(e.to_string()))?;
        let body: Value =
            serde_json::from_slice(&bytes).map_err(|e| PredictionError::InvalidResponse(e.to_string()))?;

        decode_prediction(request, &body)
    }
}
