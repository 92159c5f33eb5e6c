//! Analytics Module
//!
//! Keeps the six dashboard analytics resources fresh: concurrent per-cycle
//! fetches, per-resource Pending/Ready/Failed state, and a periodic scheduler
//! that can be stopped at any time.

pub mod aggregator;
pub mod fetcher;
pub mod payload;
pub mod resource;

pub use aggregator::{AnalyticsAggregator, CycleReport, RefreshPolicy};
pub use fetcher::{HttpResourceFetcher, ResourceFetcher};
pub use payload::{
    AnomalySummary, ErrorReport, FeatureImportance, FeatureWeight, ModelPerformance, Payload, RenderablePayload,
};
pub use resource::{AnalyticsResource, DashboardSnapshot, ResourceStatus};

use std::fmt;

use serde::{Deserialize, Serialize};

/// One independently fetched analytics category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Performance,
    FeatureImportance,
    ConfusionMatrix,
    EfficiencyScatter,
    Anomalies,
    Errors,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Performance,
        ResourceKind::FeatureImportance,
        ResourceKind::ConfusionMatrix,
        ResourceKind::EfficiencyScatter,
        ResourceKind::Anomalies,
        ResourceKind::Errors,
    ];

    /// Path of the upstream endpoint, relative to the analytics base URL
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Performance => "/model_performance",
            ResourceKind::FeatureImportance => "/feature_importance",
            ResourceKind::ConfusionMatrix => "/confusion_matrix",
            ResourceKind::EfficiencyScatter => "/efficiency_scatter",
            ResourceKind::Anomalies => "/anomalies",
            ResourceKind::Errors => "/error_detection",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Performance => "performance",
            ResourceKind::FeatureImportance => "feature_importance",
            ResourceKind::ConfusionMatrix => "confusion_matrix",
            ResourceKind::EfficiencyScatter => "efficiency_scatter",
            ResourceKind::Anomalies => "anomalies",
            ResourceKind::Errors => "errors",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
