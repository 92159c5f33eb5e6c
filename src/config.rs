//! Dashboard Configuration
//!
//! Defaults, overlaid by an optional JSON file, overlaid by `DASHBOARD_*`
//! environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::analytics::RefreshPolicy;
use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    /// Base URL of the analytics backend
    pub api_base_url: String,
    /// Path of the prediction endpoint, relative to `api_base_url`
    pub prediction_path: String,
    pub refresh_interval_secs: u64,
    /// Defaults to the refresh interval when unset
    pub cycle_deadline_secs: Option<u64>,
    pub request_timeout_secs: u64,
    pub bind_addr: String,
    /// Directory for rolling log files; stdout only when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            prediction_path: "/predict".to_string(),
            refresh_interval_secs: 10,
            cycle_deadline_secs: None,
            request_timeout_secs: 5,
            bind_addr: "127.0.0.1:8080".to_string(),
            log_dir: None,
        }
    }
}

impl DashboardConfig {
    /// Load defaults, then `path` if given, then the process environment.
    pub async fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        let env: HashMap<String, String> = std::env::vars().collect();
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Overlay `DASHBOARD_*` variables from `env`.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> ConfigResult<()> {
        if let Some(v) = env.get("DASHBOARD_API_BASE_URL") {
            self.api_base_url = v.clone();
        }
        if let Some(v) = env.get("DASHBOARD_PREDICTION_PATH") {
            self.prediction_path = v.clone();
        }
        if let Some(v) = env.get("DASHBOARD_REFRESH_SECS") {
            self.refresh_interval_secs = parse_secs("DASHBOARD_REFRESH_SECS", v)?;
        }
        if let Some(v) = env.get("DASHBOARD_CYCLE_DEADLINE_SECS") {
            self.cycle_deadline_secs = Some(parse_secs("DASHBOARD_CYCLE_DEADLINE_SECS", v)?);
        }
        if let Some(v) = env.get("DASHBOARD_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_secs("DASHBOARD_REQUEST_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = env.get("DASHBOARD_BIND_ADDR") {
            self.bind_addr = v.clone();
        }
        if let Some(v) = env.get("DASHBOARD_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid("refresh interval must be at least one second".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request timeout must be at least one second".to_string()));
        }
        match self.cycle_deadline_secs {
            Some(0) => return Err(ConfigError::Invalid("cycle deadline must be at least one second".to_string())),
            Some(d) if d > self.refresh_interval_secs => {
                return Err(ConfigError::Invalid("cycle deadline must not exceed the refresh interval".to_string()))
            }
            _ => {}
        }
        reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::Invalid(format!("api_base_url {:?}: {}", self.api_base_url, e)))?;
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("bind_addr {:?}: {}", self.bind_addr, e)))?;
        Ok(())
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        let interval = Duration::from_secs(self.refresh_interval_secs);
        let deadline = Duration::from_secs(self.cycle_deadline_secs.unwrap_or(self.refresh_interval_secs));
        RefreshPolicy::new(interval).with_cycle_deadline(deadline)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn prediction_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.prediction_path.trim_start_matches('/')
        )
    }
}

fn parse_secs(name: &str, value: &str) -> ConfigResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} must be a whole number of seconds, got {:?}", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = DashboardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.refresh_policy(), RefreshPolicy::new(Duration::from_secs(10)));
        assert_eq!(config.prediction_url(), "http://localhost:5000/predict");
    }

    #[tokio::test]
    async fn test_file_overlays_defaults() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"api_base_url": "http://analytics:9000/", "refresh_interval_secs": 30}"#).unwrap();

        let config = DashboardConfig::from_file(file.path()).await.unwrap();
        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.prediction_url(), "http://analytics:9000/predict");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DashboardConfig::from_file(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_env_overlay() {
        let env: HashMap<String, String> = [
            ("DASHBOARD_REFRESH_SECS", "20"),
            ("DASHBOARD_CYCLE_DEADLINE_SECS", "15"),
            ("DASHBOARD_BIND_ADDR", "0.0.0.0:9090"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut config = DashboardConfig::default();
        config.apply_env(&env).unwrap();
        config.validate().unwrap();

        let policy = config.refresh_policy();
        assert_eq!(policy.interval(), Duration::from_secs(20));
        assert_eq!(policy.cycle_deadline(), Duration::from_secs(15));
        assert_eq!(config.bind_addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_env_rejects_non_numeric_interval() {
        let env: HashMap<String, String> =
            [("DASHBOARD_REFRESH_SECS".to_string(), "soon".to_string())].into_iter().collect();
        let mut config = DashboardConfig::default();
        assert!(matches!(config.apply_env(&env), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = DashboardConfig {
            refresh_interval_secs: 0,
            ..DashboardConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DashboardConfig {
            cycle_deadline_secs: Some(60),
            ..DashboardConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DashboardConfig {
            api_base_url: "not a url".to_string(),
            ..DashboardConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
