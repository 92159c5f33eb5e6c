//! Dashboard Event Bus
//!
//! Asynchronous pub/sub for refresh-cycle and scenario telemetry. Owned by
//! whoever builds the aggregator and session; there is no global instance.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::analytics::ResourceKind;

/// Things worth telling a subscriber about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum DashboardEvent {
    /// A refresh cycle issued its fetches
    CycleStarted { cycle: u64 },
    /// A resource kind was replaced with a fresh payload
    ResourceReady { kind: ResourceKind, cycle: u64 },
    /// A resource kind's fetch failed
    ResourceFailed { kind: ResourceKind, cycle: u64, error: String },
    /// A completion arrived after a newer cycle had already written the kind
    StaleDiscarded { kind: ResourceKind, cycle: u64 },
    /// A cycle reached its deadline or every fetch settled
    CycleSettled { cycle: u64, ready: usize, failed: usize, outstanding: usize },
    /// The newest scenario submission produced a result
    PredictionPublished { generation: u64 },
    /// The newest scenario submission failed
    PredictionFailed { generation: u64, error: String },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all subscribers. Having none is fine.
    pub fn publish(&self, event: DashboardEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
