//! Parameter Definitions
//!
//! One bounded, step-quantized process variable and the values derived from it.

use serde::Serialize;

use crate::error::{ScenarioError, ScenarioResult};

/// Tolerance used when deciding whether a position lies on the step grid
const GRID_EPSILON: f64 = 1e-9;

/// Tolerance used when checking that a span is a whole number of steps
const SPAN_EPSILON: f64 = 1e-6;

/// Legal domain of a single tunable process parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDefinition {
    key: String,
    minimum: f64,
    maximum: f64,
    step: f64,
    unit: String,
    #[serde(skip)]
    decimals: i32,
}

impl ParameterDefinition {
    /// Create a validated definition.
    pub fn new(
        key: impl Into<String>,
        minimum: f64,
        maximum: f64,
        step: f64,
        unit: impl Into<String>,
    ) -> ScenarioResult<Self> {
        let key = key.into();
        let invalid = |reason: &str| ScenarioError::InvalidDefinition {
            key: key.clone(),
            reason: reason.to_string(),
        };

        if key.trim().is_empty() {
            return Err(invalid("key must not be empty"));
        }
        if !(minimum.is_finite() && maximum.is_finite() && step.is_finite()) {
            return Err(invalid("bounds and step must be finite"));
        }
        if minimum >= maximum {
            return Err(invalid("minimum must be below maximum"));
        }
        if step <= 0.0 {
            return Err(invalid("step must be positive"));
        }
        let steps = (maximum - minimum) / step;
        if (steps - steps.round()).abs() > SPAN_EPSILON {
            return Err(invalid("range is not a whole number of steps"));
        }

        Ok(Self::from_parts(key, minimum, maximum, step, unit.into()))
    }

    /// Build without validation. Only used for the compiled-in catalog, which
    /// is checked by the registry tests.
    pub(crate) fn from_parts(key: String, minimum: f64, maximum: f64, step: f64, unit: String) -> Self {
        Self {
            key,
            minimum,
            maximum,
            step,
            unit,
            decimals: step_decimals(step),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    pub fn maximum(&self) -> f64 {
        self.maximum
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Number of grid points between minimum and maximum, inclusive
    pub fn grid_len(&self) -> u64 {
        ((self.maximum - self.minimum) / self.step).round() as u64 + 1
    }

    /// Human-readable label derived from the camelCase key ("weldingCurrent" -> "Welding Current")
    pub fn display_label(&self) -> String {
        let mut label = String::with_capacity(self.key.len() + 4);
        for (i, c) in self.key.chars().enumerate() {
            if i == 0 {
                label.extend(c.to_uppercase());
            } else if c.is_uppercase() {
                label.push(' ');
                label.push(c);
            } else {
                label.push(c);
            }
        }
        label
    }

    /// Grid point nearest the middle of the range, used to seed sliders
    pub fn default_value(&self) -> f64 {
        self.snap_to_grid((self.minimum + self.maximum) / 2.0)
    }

    /// Clamp `raw` into range and round it to the nearest grid point (ties round down).
    pub fn quantize(&self, raw: f64) -> ScenarioResult<ParameterValue> {
        if !raw.is_finite() {
            return Err(ScenarioError::NonFiniteInput {
                key: self.key.clone(),
                value: raw,
            });
        }
        Ok(ParameterValue {
            key: self.key.clone(),
            value: self.snap_to_grid(raw),
        })
    }

    /// Whether `value` already sits on the grid (within floating-point tolerance)
    pub fn is_on_grid(&self, value: f64) -> bool {
        if value < self.minimum - GRID_EPSILON || value > self.maximum + GRID_EPSILON {
            return false;
        }
        let position = (value - self.minimum) / self.step;
        (position - position.round()).abs() <= SPAN_EPSILON
    }

    fn snap_to_grid(&self, raw: f64) -> f64 {
        let clamped = raw.clamp(self.minimum, self.maximum);
        let position = (clamped - self.minimum) / self.step;

        let lower = (position + GRID_EPSILON).floor();
        let index = if position - lower > 0.5 + GRID_EPSILON {
            lower + 1.0
        } else {
            lower
        };
        let index = index.clamp(0.0, (self.grid_len() - 1) as f64);

        let scale = 10f64.powi(self.decimals);
        ((self.minimum + index * self.step) * scale).round() / scale
    }
}

/// Decimal places needed to represent multiples of `step` exactly
fn step_decimals(step: f64) -> i32 {
    (0..=9)
        .find(|d| {
            let scaled = step * 10f64.powi(*d);
            (scaled - scaled.round()).abs() < SPAN_EPSILON
        })
        .unwrap_or(9)
}

/// A quantized, in-range value for one parameter.
///
/// Only obtainable through [`ParameterDefinition::quantize`], so every instance
/// lies on its parameter's grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterValue {
    key: String,
    value: f64,
}

impl ParameterValue {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voltage() -> ParameterDefinition {
        ParameterDefinition::new("cellVoltage", 3.2, 4.2, 0.1, "V").unwrap()
    }

    #[test]
    fn test_rejects_inverted_range() {
        let err = ParameterDefinition::new("x", 2.0, 1.0, 0.1, "").unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_rejects_non_positive_step() {
        assert!(ParameterDefinition::new("x", 0.0, 1.0, 0.0, "").is_err());
        assert!(ParameterDefinition::new("x", 0.0, 1.0, -0.1, "").is_err());
    }

    #[test]
    fn test_rejects_span_off_grid() {
        assert!(ParameterDefinition::new("x", 0.0, 1.0, 0.3, "").is_err());
    }

    #[test]
    fn test_quantize_snaps_to_nearest_step() {
        let def = voltage();
        assert_eq!(def.quantize(3.5).unwrap().value(), 3.5);
        assert_eq!(def.quantize(3.53).unwrap().value(), 3.5);
        assert_eq!(def.quantize(3.57).unwrap().value(), 3.6);
    }

    #[test]
    fn test_quantize_ties_round_down() {
        let def = ParameterDefinition::new("torque", 5.0, 15.0, 0.5, "Nm").unwrap();
        assert_eq!(def.quantize(10.25).unwrap().value(), 10.0);

        let def = voltage();
        assert_eq!(def.quantize(3.35).unwrap().value(), 3.3);
    }

    #[test]
    fn test_quantize_clamps_out_of_range() {
        let def = voltage();
        assert_eq!(def.quantize(-10.0).unwrap().value(), 3.2);
        assert_eq!(def.quantize(99.0).unwrap().value(), 4.2);
    }

    #[test]
    fn test_quantize_rejects_non_finite() {
        let def = voltage();
        assert!(matches!(def.quantize(f64::NAN), Err(ScenarioError::NonFiniteInput { .. })));
        assert!(matches!(def.quantize(f64::INFINITY), Err(ScenarioError::NonFiniteInput { .. })));
    }

    #[test]
    fn test_display_label() {
        let def = ParameterDefinition::new("weldingCurrent", 100.0, 300.0, 10.0, "A").unwrap();
        assert_eq!(def.display_label(), "Welding Current");
    }

    #[test]
    fn test_grid_len_and_default() {
        let def = voltage();
        assert_eq!(def.grid_len(), 11);
        assert_eq!(def.default_value(), 3.7);
    }
}
