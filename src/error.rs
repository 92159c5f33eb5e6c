//! Error Taxonomy
//!
//! Typed errors for each layer of the dashboard backend. Request-construction
//! errors are always caller-correctable; gateway and fetch errors are surfaced
//! to whoever issued the call and never bring the process down.

use thiserror::Error;

/// Errors raised while building or validating a scenario request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScenarioError {
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("missing value for parameter: {0}")]
    MissingParameter(String),

    #[error("non-finite value {value} supplied for parameter {key}")]
    NonFiniteInput { key: String, value: f64 },

    #[error("could not parse {input:?} as a number for parameter {key}")]
    MalformedInput { key: String, input: String },

    #[error("invalid definition for parameter {key}: {reason}")]
    InvalidDefinition { key: String, reason: String },
}

pub type ScenarioResult<T> = std::result::Result<T, ScenarioError>;

/// Errors raised by a prediction round trip
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("prediction service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("invalid prediction response: {0}")]
    InvalidResponse(String),

    /// A newer submission from the same session replaced this one.
    #[error("prediction superseded by a newer submission")]
    Superseded,
}

pub type GatewayResult<T> = std::result::Result<T, PredictionError>;

/// Errors raised while fetching or decoding one analytics resource
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {status}")]
    Status { status: u16 },

    #[error("could not decode payload: {0}")]
    Decode(String),
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status { status: status.as_u16() },
            None if err.is_decode() => FetchError::Decode(err.to_string()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_parameter() {
        let err = ScenarioError::MissingParameter("torque".to_string());
        assert_eq!(err.to_string(), "missing value for parameter: torque");

        let err = ScenarioError::NonFiniteInput { key: "torque".to_string(), value: f64::NAN };
        assert!(err.to_string().contains("torque"));
    }

    #[test]
    fn test_json_error_maps_to_decode() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(FetchError::from(err), FetchError::Decode(_)));
    }
}
