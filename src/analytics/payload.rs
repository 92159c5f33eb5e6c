//! Analytics Payloads
//!
//! Typed bodies of the six analytics endpoints and the decoding rules that
//! turn a raw JSON body into one of them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ResourceKind;
use crate::error::{FetchError, FetchResult};

/// Model-quality figures from `/model_performance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    /// Classifier accuracy, 0 to 1
    pub defect_accuracy: f64,
    pub efficiency_r2: f64,
    pub efficiency_mse: f64,
}

/// One bar of the feature-importance chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    #[serde(alias = "y")]
    pub label: String,
    #[serde(alias = "x")]
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub data: Vec<FeatureWeight>,
}

/// Chart payload passed through untouched; its encoding belongs to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderablePayload(pub Value);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub num_anomalies: u64,
    /// Share of anomalous samples, 0 to 100
    pub anomaly_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub errors: Vec<String>,
}

/// A decoded payload, tagged by the resource it belongs to
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Performance(ModelPerformance),
    FeatureImportance(FeatureImportance),
    ConfusionMatrix(RenderablePayload),
    EfficiencyScatter(RenderablePayload),
    Anomalies(AnomalySummary),
    Errors(ErrorReport),
}

impl Payload {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Payload::Performance(_) => ResourceKind::Performance,
            Payload::FeatureImportance(_) => ResourceKind::FeatureImportance,
            Payload::ConfusionMatrix(_) => ResourceKind::ConfusionMatrix,
            Payload::EfficiencyScatter(_) => ResourceKind::EfficiencyScatter,
            Payload::Anomalies(_) => ResourceKind::Anomalies,
            Payload::Errors(_) => ResourceKind::Errors,
        }
    }
}

/// Decode the raw body fetched for `kind`.
///
/// The analytics backend serialises some bodies twice, so a body that is a
/// JSON string holding JSON is unwrapped once first.
pub fn decode(kind: ResourceKind, body: Value) -> FetchResult<Payload> {
    let body = unwrap_double_encoded(body);

    let payload = match kind {
        ResourceKind::Performance => {
            let perf: ModelPerformance = serde_json::from_value(body)?;
            check_range("defect_accuracy", perf.defect_accuracy, 0.0, 1.0)?;
            check_finite("efficiency_r2", perf.efficiency_r2)?;
            check_range("efficiency_mse", perf.efficiency_mse, 0.0, f64::MAX)?;
            Payload::Performance(perf)
        }
        ResourceKind::FeatureImportance => {
            let importance: FeatureImportance = serde_json::from_value(body)?;
            for weight in &importance.data {
                check_finite(&weight.label, weight.value)?;
            }
            Payload::FeatureImportance(importance)
        }
        ResourceKind::ConfusionMatrix => Payload::ConfusionMatrix(RenderablePayload(body)),
        ResourceKind::EfficiencyScatter => Payload::EfficiencyScatter(RenderablePayload(body)),
        ResourceKind::Anomalies => {
            let anomalies: AnomalySummary = serde_json::from_value(body)?;
            check_range("anomaly_percentage", anomalies.anomaly_percentage, 0.0, 100.0)?;
            Payload::Anomalies(anomalies)
        }
        ResourceKind::Errors => Payload::Errors(serde_json::from_value(body)?),
    };
    Ok(payload)
}

fn unwrap_double_encoded(body: Value) -> Value {
    match body {
        Value::String(inner) => match serde_json::from_str::<Value>(&inner) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
            _ => Value::String(inner),
        },
        other => other,
    }
}

fn check_finite(field: &str, value: f64) -> FetchResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(FetchError::Decode(format!("{} is not finite", field)))
    }
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> FetchResult<()> {
    check_finite(field, value)?;
    if value < min || value > max {
        return Err(FetchError::Decode(format!("{} = {} outside [{}, {}]", field, value, min, max)));
    }
    Ok(())
}
