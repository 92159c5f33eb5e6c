//! Analytics Aggregator
//!
//! Drives refresh cycles over every [`ResourceKind`]. Each cycle fetches all
//! kinds concurrently; every fetch applies its own outcome as soon as it
//! settles, so one failure never holds back another kind's update.
//!
//! Cycles never overlap: each holds the cycle lock from start to deadline,
//! waits for its fetches only until that deadline (at most one interval),
//! and ticks missed meanwhile are skipped rather than queued. Fetches still outstanding at the deadline keep
//! running detached; whatever they produce is dropped if a later cycle has
//! already written that kind.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::fetcher::ResourceFetcher;
use super::payload::decode;
use super::resource::DashboardSnapshot;
use super::ResourceKind;
use crate::events::{DashboardEvent, EventBus};

/// Shortest interval the scheduler accepts
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// When refresh cycles run and how long each may wait for its fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    interval: Duration,
    cycle_deadline: Duration,
}

impl RefreshPolicy {
    /// Refresh every `interval`; each cycle may wait up to one interval.
    pub fn new(interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        Self {
            interval,
            cycle_deadline: interval,
        }
    }

    /// Shorten the per-cycle deadline. Capped at the interval.
    pub fn with_cycle_deadline(mut self, deadline: Duration) -> Self {
        self.cycle_deadline = deadline.min(self.interval);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cycle_deadline(&self) -> Duration {
        self.cycle_deadline
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// How one refresh cycle went, as far as its deadline
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub ready: Vec<ResourceKind>,
    pub failed: Vec<ResourceKind>,
    /// Settled, but a newer cycle had already written the kind
    pub discarded: Vec<ResourceKind>,
    /// Still in flight when the deadline passed
    pub outstanding: Vec<ResourceKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchOutcome {
    Ready,
    Failed,
    Discarded,
}

/// Outstanding fetch tasks. `stop` bumps `epoch`, so a scheduler started
/// before the stop can no longer spawn.
#[derive(Default)]
struct InFlight {
    epoch: u64,
    handles: Vec<AbortHandle>,
}

struct Shared {
    fetcher: Arc<dyn ResourceFetcher>,
    policy: RefreshPolicy,
    snapshot: watch::Sender<DashboardSnapshot>,
    events: EventBus,
    last_cycle: AtomicU64,
    cycle_lock: Mutex<()>,
    in_flight: Mutex<InFlight>,
}

impl Shared {
    /// Run one cycle. With `epoch` set, the cycle is skipped (`None`) once a
    /// `stop` has moved past that epoch.
    async fn run_cycle(self: &Arc<Self>, epoch: Option<u64>) -> Option<CycleReport> {
        let _cycle_guard = self.cycle_lock.lock().await;

        let mut pending = FuturesUnordered::new();
        let (cycle, deadline) = {
            let mut in_flight = self.in_flight.lock().await;
            if epoch.is_some_and(|epoch| epoch != in_flight.epoch) {
                debug!("Aggregator stopped; scheduled cycle skipped");
                return None;
            }

            let cycle = self.last_cycle.fetch_add(1, Ordering::SeqCst) + 1;
            let deadline = Instant::now() + self.policy.cycle_deadline;
            debug!(cycle, "Refresh cycle started");
            self.events.publish(DashboardEvent::CycleStarted { cycle });

            in_flight.handles.retain(|handle| !handle.is_finished());
            for kind in ResourceKind::ALL {
                let shared = Arc::clone(self);
                let handle = tokio::spawn(async move { shared.fetch_and_apply(cycle, kind).await });
                in_flight.handles.push(handle.abort_handle());
                pending.push(async move { (kind, handle.await) });
            }
            (cycle, deadline)
        };

        let mut report = CycleReport {
            cycle,
            ..CycleReport::default()
        };
        let mut settled = HashSet::new();

        while let Ok(Some((kind, joined))) = tokio::time::timeout_at(deadline, pending.next()).await {
            settled.insert(kind);
            match joined {
                Ok(FetchOutcome::Ready) => report.ready.push(kind),
                Ok(FetchOutcome::Failed) => report.failed.push(kind),
                Ok(FetchOutcome::Discarded) => report.discarded.push(kind),
                Err(e) if e.is_cancelled() => report.discarded.push(kind),
                Err(e) => {
                    error!(cycle, %kind, "Fetch task panicked: {}", e);
                    match self.apply_failure(cycle, kind, "fetch task panicked") {
                        FetchOutcome::Failed => report.failed.push(kind),
                        _ => report.discarded.push(kind),
                    }
                }
            }
        }

        report.outstanding = ResourceKind::ALL
            .into_iter()
            .filter(|kind| !settled.contains(kind))
            .collect();
        if !report.outstanding.is_empty() {
            warn!(cycle, outstanding = ?report.outstanding, "Cycle deadline passed with fetches in flight");
        }

        self.events.publish(DashboardEvent::CycleSettled {
            cycle,
            ready: report.ready.len(),
            failed: report.failed.len(),
            outstanding: report.outstanding.len(),
        });
        Some(report)
    }

    async fn fetch_and_apply(&self, cycle: u64, kind: ResourceKind) -> FetchOutcome {
        let decoded = match self.fetcher.fetch(kind).await {
            Ok(body) => decode(kind, body),
            Err(e) => Err(e),
        };

        match decoded {
            Ok(payload) => {
                let at = Utc::now();
                if self.snapshot.send_if_modified(|snap| snap.apply_ready(cycle, payload, at)) {
                    debug!(cycle, %kind, "Resource ready");
                    self.events.publish(DashboardEvent::ResourceReady { kind, cycle });
                    FetchOutcome::Ready
                } else {
                    self.discard(cycle, kind)
                }
            }
            Err(e) => {
                warn!(cycle, %kind, "Resource fetch failed: {}", e);
                self.apply_failure(cycle, kind, &e.to_string())
            }
        }
    }

    fn apply_failure(&self, cycle: u64, kind: ResourceKind, error: &str) -> FetchOutcome {
        let at = Utc::now();
        if self.snapshot.send_if_modified(|snap| snap.apply_failed(kind, cycle, error, at)) {
            self.events.publish(DashboardEvent::ResourceFailed {
                kind,
                cycle,
                error: error.to_string(),
            });
            FetchOutcome::Failed
        } else {
            self.discard(cycle, kind)
        }
    }

    fn discard(&self, cycle: u64, kind: ResourceKind) -> FetchOutcome {
        debug!(cycle, %kind, "Discarding completion from superseded cycle");
        self.events.publish(DashboardEvent::StaleDiscarded { kind, cycle });
        FetchOutcome::Discarded
    }
}

/// Owns the analytics snapshot and the scheduler that keeps it fresh
pub struct AnalyticsAggregator {
    shared: Arc<Shared>,
    scheduler: Mutex<Option<JoinHandle<()>>>,
}

impl AnalyticsAggregator {
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, policy: RefreshPolicy, events: EventBus) -> Self {
        let (snapshot, _) = watch::channel(DashboardSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                fetcher,
                policy,
                snapshot,
                events,
                last_cycle: AtomicU64::new(0),
                cycle_lock: Mutex::new(()),
                in_flight: Mutex::new(InFlight::default()),
            }),
            scheduler: Mutex::new(None),
        }
    }

    /// Run the first cycle now, then one per interval. No-op while already running.
    pub async fn start(&self) {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Aggregator already running");
            return;
        }

        let shared = Arc::clone(&self.shared);
        let interval = shared.policy.interval;
        let epoch = shared.in_flight.lock().await.epoch;
        info!(?interval, "Starting analytics refresh");

        *scheduler = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(report) = shared.run_cycle(Some(epoch)).await else {
                    break;
                };
                info!(
                    cycle = report.cycle,
                    ready = report.ready.len(),
                    failed = report.failed.len(),
                    outstanding = report.outstanding.len(),
                    "Refresh cycle settled"
                );
            }
        }));
    }

    /// Halt scheduling and abort every outstanding fetch. Safe to call repeatedly or before `start`.
    pub async fn stop(&self) {
        if let Some(handle) = self.scheduler.lock().await.take() {
            handle.abort();
            info!("Analytics refresh stopped");
        }
        let mut in_flight = self.shared.in_flight.lock().await;
        in_flight.epoch += 1;
        for handle in in_flight.handles.drain(..) {
            handle.abort();
        }
    }

    pub async fn is_running(&self) -> bool {
        self.scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one cycle on the caller's task, after any cycle already running.
    pub async fn refresh_now(&self) -> CycleReport {
        self.shared.run_cycle(None).await.unwrap_or_default()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.shared.policy
    }

    /// Number of the most recently started cycle
    pub fn last_cycle(&self) -> u64 {
        self.shared.last_cycle.load(Ordering::SeqCst)
    }
}

impl Drop for AnalyticsAggregator {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduler.get_mut().take() {
            handle.abort();
        }
        if let Ok(mut in_flight) = self.shared.in_flight.try_lock() {
            in_flight.epoch += 1;
            for handle in in_flight.handles.drain(..) {
                handle.abort();
            }
        }
    }
}
