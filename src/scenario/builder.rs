//! Scenario Request Builder
//!
//! The single validation boundary in front of the prediction service. Raw
//! slider or form values go in; a request that is complete and on-grid comes
//! out, or a caller-correctable error explains what is wrong.

use std::collections::HashMap;

use tracing::debug;

use super::{ScenarioMode, ScenarioRequest};
use crate::error::{ScenarioError, ScenarioResult};
use crate::parameters::{ParameterSpaceRegistry, ParameterValue};

/// Converts raw values into validated [`ScenarioRequest`]s
pub struct ScenarioRequestBuilder<'a> {
    registry: &'a ParameterSpaceRegistry,
}

impl<'a> ScenarioRequestBuilder<'a> {
    pub fn new(registry: &'a ParameterSpaceRegistry) -> Self {
        Self { registry }
    }

    /// Build a request with every registered parameter fixed.
    pub fn build_what_if(&self, values: &HashMap<String, f64>) -> ScenarioResult<ScenarioRequest> {
        let fixed = self.quantize_all(values, None)?;
        Ok(ScenarioRequest::new(ScenarioMode::WhatIf, fixed))
    }

    /// Build a request that leaves `target` free.
    ///
    /// A value supplied for `target` itself is ignored: it is the dependent variable.
    pub fn build_optimize(&self, target: &str, values: &HashMap<String, f64>) -> ScenarioResult<ScenarioRequest> {
        let target = self.registry.definition_of(target)?.key().to_string();
        let fixed = self.quantize_all(values, Some(&target))?;
        Ok(ScenarioRequest::new(ScenarioMode::Optimize { target }, fixed))
    }

    fn quantize_all(&self, values: &HashMap<String, f64>, skip: Option<&str>) -> ScenarioResult<Vec<ParameterValue>> {
        for key in values.keys().filter(|k| !self.registry.contains(k)) {
            debug!(key = %key, "Ignoring value for unregistered parameter");
        }

        self.registry
            .definitions()
            .iter()
            .filter(|def| Some(def.key()) != skip)
            .map(|def| {
                let raw = values
                    .get(def.key())
                    .ok_or_else(|| ScenarioError::MissingParameter(def.key().to_string()))?;
                def.quantize(*raw)
            })
            .collect()
    }
}

/// Parse raw text fields into numbers.
///
/// Blank fields are treated as absent so they surface as `MissingParameter`
/// when the request is built.
pub fn parse_form_inputs(fields: &HashMap<String, String>) -> ScenarioResult<HashMap<String, f64>> {
    let mut values = HashMap::with_capacity(fields.len());
    for (key, input) in fields {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = trimmed.parse::<f64>().map_err(|_| ScenarioError::MalformedInput {
            key: key.clone(),
            input: input.clone(),
        })?;
        values.insert(key.clone(), value);
    }
    Ok(values)
}
