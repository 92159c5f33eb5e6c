//! Parameter Space
//!
//! Static catalog of every tunable process parameter on the module assembly
//! line, and the rules that clamp and quantize raw values onto each
//! parameter's step grid.

mod definition;

pub use definition::{ParameterDefinition, ParameterValue};

use std::collections::HashSet;

use crate::error::{ScenarioError, ScenarioResult};

/// (key, minimum, maximum, step, unit) for the assembly-line catalog, in registration order
const ASSEMBLY_LINE_CATALOG: [(&str, f64, f64, f64, &str); 9] = [
    ("cellVoltage", 3.2, 4.2, 0.1, "V"),
    ("cellImpedance", 0.5, 2.0, 0.1, "Ω"),
    ("cellCapacity", 2000.0, 5000.0, 100.0, "mAh"),
    ("compressionForce", 500.0, 2000.0, 50.0, "N"),
    ("weldingCurrent", 100.0, 300.0, 10.0, "A"),
    ("weldingTime", 0.1, 1.0, 0.1, "s"),
    ("torque", 5.0, 15.0, 0.5, "Nm"),
    ("assemblyTime", 10.0, 30.0, 1.0, "min"),
    ("leakageRate", 0.0, 0.1, 0.01, "cm³/min"),
];

/// Read-only registry of parameter definitions, in registration order
#[derive(Debug, Clone)]
pub struct ParameterSpaceRegistry {
    definitions: Vec<ParameterDefinition>,
}

impl ParameterSpaceRegistry {
    /// Build a registry from already-validated definitions. Fails on duplicate keys.
    pub fn new(definitions: Vec<ParameterDefinition>) -> ScenarioResult<Self> {
        let mut seen = HashSet::new();
        for def in &definitions {
            if !seen.insert(def.key()) {
                return Err(ScenarioError::InvalidDefinition {
                    key: def.key().to_string(),
                    reason: "duplicate key".to_string(),
                });
            }
        }
        Ok(Self { definitions })
    }

    /// The fixed EV battery-module assembly catalog
    pub fn assembly_line() -> Self {
        let definitions = ASSEMBLY_LINE_CATALOG
            .iter()
            .map(|(key, min, max, step, unit)| {
                ParameterDefinition::from_parts(key.to_string(), *min, *max, *step, unit.to_string())
            })
            .collect();
        Self { definitions }
    }

    pub fn definition_of(&self, key: &str) -> ScenarioResult<&ParameterDefinition> {
        self.definitions
            .iter()
            .find(|def| def.key() == key)
            .ok_or_else(|| ScenarioError::UnknownParameter(key.to_string()))
    }

    /// Keys in registration order
    pub fn all_keys(&self) -> Vec<&str> {
        self.definitions.iter().map(|def| def.key()).collect()
    }

    pub fn definitions(&self) -> &[ParameterDefinition] {
        &self.definitions
    }

    pub fn contains(&self, key: &str) -> bool {
        self.definitions.iter().any(|def| def.key() == key)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn quantize(&self, key: &str, raw: f64) -> ScenarioResult<ParameterValue> {
        self.definition_of(key)?.quantize(raw)
    }
}

impl Default for ParameterSpaceRegistry {
    fn default() -> Self {
        Self::assembly_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_definitions_are_valid() {
        for (key, min, max, step, unit) in ASSEMBLY_LINE_CATALOG {
            assert!(
                ParameterDefinition::new(key, min, max, step, unit).is_ok(),
                "catalog entry {} is invalid",
                key
            );
        }
    }

    #[test]
    fn test_all_keys_in_registration_order() {
        let registry = ParameterSpaceRegistry::assembly_line();
        assert_eq!(
            registry.all_keys(),
            vec![
                "cellVoltage",
                "cellImpedance",
                "cellCapacity",
                "compressionForce",
                "weldingCurrent",
                "weldingTime",
                "torque",
                "assemblyTime",
                "leakageRate",
            ]
        );
        assert_eq!(registry.all_keys(), registry.all_keys());
    }

    #[test]
    fn test_definition_of_unknown_key() {
        let registry = ParameterSpaceRegistry::assembly_line();
        assert_eq!(
            registry.definition_of("humidity").unwrap_err(),
            ScenarioError::UnknownParameter("humidity".to_string())
        );
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let def = ParameterDefinition::new("torque", 5.0, 15.0, 0.5, "Nm").unwrap();
        let err = ParameterSpaceRegistry::new(vec![def.clone(), def]).unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_quantize_stays_in_range_and_on_grid() {
        let registry = ParameterSpaceRegistry::assembly_line();
        let samples = [-1e6, -3.3, 0.0, 0.015, 0.37, 1.05, 3.14159, 12.75, 150.0, 777.7, 2049.0, 1e9];

        for def in registry.definitions() {
            for raw in samples {
                let value = registry.quantize(def.key(), raw).unwrap().value();
                assert!(value >= def.minimum() && value <= def.maximum(), "{} -> {}", raw, value);
                assert!(def.is_on_grid(value), "{} -> {} is off grid for {}", raw, value, def.key());

                let clamped = raw.clamp(def.minimum(), def.maximum());
                assert!((value - clamped).abs() <= def.step() / 2.0 + 1e-9);
            }
        }
    }

    #[test]
    fn test_quantize_is_idempotent() {
        let registry = ParameterSpaceRegistry::assembly_line();
        for def in registry.definitions() {
            let mut raw = def.minimum() - def.step();
            while raw <= def.maximum() + def.step() {
                let once = registry.quantize(def.key(), raw).unwrap();
                let twice = registry.quantize(def.key(), once.value()).unwrap();
                assert_eq!(once, twice);
                raw += def.step() / 3.0;
            }
        }
    }
}
