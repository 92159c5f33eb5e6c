//! Scenario Session
//!
//! Owns the prediction gateway for one dashboard session. A new submission
//! aborts the one still in flight, and only the newest submission's outcome
//! ever reaches the shared view. A failed submission leaves the previous
//! result visible. Dropping the submitting future abandons its call.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::{PredictionGateway, PredictionResult, ScenarioRequest};
use crate::error::{GatewayResult, PredictionError};
use crate::events::{DashboardEvent, EventBus};

/// What the presentation layer sees of the scenario tool
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioView {
    /// Newest successful result; kept when a later submission fails
    pub latest: Option<PredictionResult>,
    /// Error of the newest submission, cleared by the next success
    pub last_error: Option<String>,
    /// Whether the newest submission is still awaiting a reply
    pub pending: bool,
    /// Sequence number of the newest submission
    pub generation: u64,
}

#[derive(Default)]
struct InFlight {
    generation: u64,
    handle: Option<AbortHandle>,
}

pub struct ScenarioSession {
    gateway: Arc<dyn PredictionGateway>,
    in_flight: Mutex<InFlight>,
    view: watch::Sender<ScenarioView>,
    events: EventBus,
}

impl ScenarioSession {
    pub fn new(gateway: Arc<dyn PredictionGateway>, events: EventBus) -> Self {
        let (view, _) = watch::channel(ScenarioView::default());
        Self {
            gateway,
            in_flight: Mutex::new(InFlight::default()),
            view,
            events,
        }
    }

    /// Submit a scenario, superseding any submission still in flight.
    ///
    /// Returns `Superseded` if a newer submission overtook this one before it
    /// could be published.
    pub async fn submit(&self, request: ScenarioRequest) -> GatewayResult<PredictionResult> {
        let (generation, handle) = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(previous) = in_flight.handle.take() {
                previous.abort();
            }
            in_flight.generation += 1;
            let generation = in_flight.generation;

            let gateway = self.gateway.clone();
            let handle = tokio::spawn(async move { gateway.submit(&request).await });
            in_flight.handle = Some(handle.abort_handle());

            self.view.send_modify(|view| {
                view.pending = true;
                view.generation = generation;
            });
            (generation, handle)
        };

        debug!(generation, "Scenario submitted");

        let guard = CallGuard {
            session: self,
            generation,
            handle: Some(handle.abort_handle()),
        };
        let joined = handle.await;
        guard.disarm();

        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => {
                debug!(generation, "Scenario call abandoned");
                return Err(PredictionError::Superseded);
            }
            Err(e) => Err(PredictionError::ServiceUnavailable(format!("prediction task failed: {}", e))),
        };

        self.publish(generation, outcome)
    }

    fn publish(&self, generation: u64, outcome: GatewayResult<PredictionResult>) -> GatewayResult<PredictionResult> {
        let published = self.view.send_if_modified(|view| {
            if view.generation != generation {
                return false;
            }
            view.pending = false;
            match &outcome {
                Ok(result) => {
                    view.latest = Some(result.clone());
                    view.last_error = None;
                }
                Err(e) => view.last_error = Some(e.to_string()),
            }
            true
        });

        if !published {
            debug!(generation, "Discarding outcome of superseded scenario");
            return Err(PredictionError::Superseded);
        }

        match &outcome {
            Ok(_) => {
                info!(generation, "Scenario prediction published");
                self.events.publish(DashboardEvent::PredictionPublished { generation });
            }
            Err(e) => {
                warn!(generation, "Scenario prediction failed: {}", e);
                self.events.publish(DashboardEvent::PredictionFailed {
                    generation,
                    error: e.to_string(),
                });
            }
        }
        outcome
    }

    /// Abandon whatever is in flight without submitting anything new.
    pub async fn cancel(&self) {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(handle) = in_flight.handle.take() {
            handle.abort();
        }
        in_flight.generation += 1;
        let generation = in_flight.generation;
        self.view.send_modify(|view| {
            view.pending = false;
            view.generation = generation;
        });
    }

    pub fn view(&self) -> ScenarioView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScenarioView> {
        self.view.subscribe()
    }
}

/// Abandons the call if the submitting future is dropped before it settles
struct CallGuard<'a> {
    session: &'a ScenarioSession,
    generation: u64,
    handle: Option<AbortHandle>,
}

impl CallGuard<'_> {
    fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        let Some(handle) = self.handle.take() else { return };
        handle.abort();

        let generation = self.generation;
        let cleared = self.session.view.send_if_modified(|view| {
            if view.generation != generation || !view.pending {
                return false;
            }
            view.pending = false;
            true
        });
        if cleared {
            debug!(generation, "Scenario caller went away; call abandoned");
        }
    }
}

impl Drop for ScenarioSession {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.get_mut().handle.take() {
            handle.abort();
        }
    }
}
