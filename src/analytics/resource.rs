//! Analytics Resources
//!
//! Per-resource Pending/Ready/Failed state and the snapshot that groups all
//! six kinds. Every write is a whole-resource replacement tagged with the
//! refresh cycle that produced it; a write from an older cycle than the one
//! already recorded is refused.
//!
//! A failed fetch discards the previous payload: a resource in `Failed`
//! never shows data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::payload::{AnomalySummary, ErrorReport, FeatureImportance, ModelPerformance, Payload, RenderablePayload};
use super::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
enum ResourceState<T> {
    Pending,
    Ready { payload: Arc<T>, updated_at: DateTime<Utc> },
    Failed { error: String, updated_at: DateTime<Utc> },
}

/// Current state of one analytics resource
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsResource<T> {
    state: ResourceState<T>,
    cycle: u64,
}

impl<T> AnalyticsResource<T> {
    pub fn pending() -> Self {
        Self {
            state: ResourceState::Pending,
            cycle: 0,
        }
    }

    pub fn status(&self) -> ResourceStatus {
        match self.state {
            ResourceState::Pending => ResourceStatus::Pending,
            ResourceState::Ready { .. } => ResourceStatus::Ready,
            ResourceState::Failed { .. } => ResourceStatus::Failed,
        }
    }

    /// Payload, only while Ready
    pub fn payload(&self) -> Option<&T> {
        match &self.state {
            ResourceState::Ready { payload, .. } => Some(payload.as_ref()),
            _ => None,
        }
    }

    /// Error of the last fetch, only while Failed
    pub fn last_error(&self) -> Option<&str> {
        match &self.state {
            ResourceState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            ResourceState::Pending => None,
            ResourceState::Ready { updated_at, .. } | ResourceState::Failed { updated_at, .. } => Some(*updated_at),
        }
    }

    /// Refresh cycle that produced the current state (0 while never written)
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Replace with a fresh payload. Refused if `cycle` is not newer than the current one.
    pub fn set_ready(&mut self, cycle: u64, payload: T, updated_at: DateTime<Utc>) -> bool {
        if cycle <= self.cycle {
            return false;
        }
        *self = Self {
            state: ResourceState::Ready {
                payload: Arc::new(payload),
                updated_at,
            },
            cycle,
        };
        true
    }

    /// Replace with a failure, dropping any previous payload. Refused if `cycle` is not newer.
    pub fn set_failed(&mut self, cycle: u64, error: impl Into<String>, updated_at: DateTime<Utc>) -> bool {
        if cycle <= self.cycle {
            return false;
        }
        *self = Self {
            state: ResourceState::Failed {
                error: error.into(),
                updated_at,
            },
            cycle,
        };
        true
    }
}

impl<T> Default for AnalyticsResource<T> {
    fn default() -> Self {
        Self::pending()
    }
}

#[derive(Serialize)]
struct ResourceWire<'a, T> {
    status: ResourceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<&'a str>,
    last_updated_at: Option<DateTime<Utc>>,
    cycle: u64,
}

impl<T: Serialize> Serialize for AnalyticsResource<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ResourceWire {
            status: self.status(),
            payload: self.payload(),
            last_error: self.last_error(),
            last_updated_at: self.last_updated_at(),
            cycle: self.cycle,
        }
        .serialize(serializer)
    }
}

/// All six resources as the presentation layer sees them
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub performance: AnalyticsResource<ModelPerformance>,
    pub feature_importance: AnalyticsResource<FeatureImportance>,
    pub confusion_matrix: AnalyticsResource<RenderablePayload>,
    pub efficiency_scatter: AnalyticsResource<RenderablePayload>,
    pub anomalies: AnalyticsResource<AnomalySummary>,
    pub errors: AnalyticsResource<ErrorReport>,
}

impl DashboardSnapshot {
    /// Record a successful fetch from `cycle`. Returns false if the write was stale.
    pub fn apply_ready(&mut self, cycle: u64, payload: Payload, at: DateTime<Utc>) -> bool {
        match payload {
            Payload::Performance(p) => self.performance.set_ready(cycle, p, at),
            Payload::FeatureImportance(p) => self.feature_importance.set_ready(cycle, p, at),
            Payload::ConfusionMatrix(p) => self.confusion_matrix.set_ready(cycle, p, at),
            Payload::EfficiencyScatter(p) => self.efficiency_scatter.set_ready(cycle, p, at),
            Payload::Anomalies(p) => self.anomalies.set_ready(cycle, p, at),
            Payload::Errors(p) => self.errors.set_ready(cycle, p, at),
        }
    }

    /// Record a failed fetch from `cycle`. Returns false if the write was stale.
    pub fn apply_failed(&mut self, kind: ResourceKind, cycle: u64, error: &str, at: DateTime<Utc>) -> bool {
        match kind {
            ResourceKind::Performance => self.performance.set_failed(cycle, error, at),
            ResourceKind::FeatureImportance => self.feature_importance.set_failed(cycle, error, at),
            ResourceKind::ConfusionMatrix => self.confusion_matrix.set_failed(cycle, error, at),
            ResourceKind::EfficiencyScatter => self.efficiency_scatter.set_failed(cycle, error, at),
            ResourceKind::Anomalies => self.anomalies.set_failed(cycle, error, at),
            ResourceKind::Errors => self.errors.set_failed(cycle, error, at),
        }
    }

    pub fn status_of(&self, kind: ResourceKind) -> ResourceStatus {
        match kind {
            ResourceKind::Performance => self.performance.status(),
            ResourceKind::FeatureImportance => self.feature_importance.status(),
            ResourceKind::ConfusionMatrix => self.confusion_matrix.status(),
            ResourceKind::EfficiencyScatter => self.efficiency_scatter.status(),
            ResourceKind::Anomalies => self.anomalies.status(),
            ResourceKind::Errors => self.errors.status(),
        }
    }

    pub fn cycle_of(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Performance => self.performance.cycle(),
            ResourceKind::FeatureImportance => self.feature_importance.cycle(),
            ResourceKind::ConfusionMatrix => self.confusion_matrix.cycle(),
            ResourceKind::EfficiencyScatter => self.efficiency_scatter.cycle(),
            ResourceKind::Anomalies => self.anomalies.cycle(),
            ResourceKind::Errors => self.errors.cycle(),
        }
    }

    /// Kinds currently in `status`
    pub fn kinds_with(&self, status: ResourceStatus) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| self.status_of(*kind) == status)
            .collect()
    }
}
