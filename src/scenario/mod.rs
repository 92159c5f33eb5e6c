//! Scenario Module
//!
//! What-if and optimizer scenarios over the assembly parameter space:
//! validated request construction, the prediction gateway, and the session
//! that keeps only the newest submission's outcome visible.

mod builder;
pub mod gateway;
pub mod session;

pub use builder::{parse_form_inputs, ScenarioRequestBuilder};
pub use gateway::{HttpPredictionGateway, PredictionGateway, PredictionResult};
pub use session::{ScenarioSession, ScenarioView};

use serde::Serialize;

use crate::parameters::ParameterValue;

/// How the prediction service should treat a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScenarioMode {
    /// Every parameter is fixed; the service only predicts outcomes.
    WhatIf,
    /// One parameter is left free for the service to solve for.
    Optimize { target: String },
}

/// A validated scenario, ready to hand to a [`PredictionGateway`].
///
/// Built only through [`ScenarioRequestBuilder`]; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRequest {
    mode: ScenarioMode,
    fixed_values: Vec<ParameterValue>,
}

impl ScenarioRequest {
    pub(crate) fn new(mode: ScenarioMode, fixed_values: Vec<ParameterValue>) -> Self {
        Self { mode, fixed_values }
    }

    pub fn mode(&self) -> &ScenarioMode {
        &self.mode
    }

    pub fn is_what_if(&self) -> bool {
        matches!(self.mode, ScenarioMode::WhatIf)
    }

    /// The free parameter, present only in optimizer mode
    pub fn optimize_target(&self) -> Option<&str> {
        match &self.mode {
            ScenarioMode::WhatIf => None,
            ScenarioMode::Optimize { target } => Some(target),
        }
    }

    /// Fixed inputs in registration order
    pub fn fixed_values(&self) -> &[ParameterValue] {
        &self.fixed_values
    }

    pub fn fixed_value(&self, key: &str) -> Option<f64> {
        self.fixed_values
            .iter()
            .find(|v| v.key() == key)
            .map(ParameterValue::value)
    }
}
