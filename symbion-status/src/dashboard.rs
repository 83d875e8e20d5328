/**
 * DASHBOARD - wiring between the fetch pipeline and what the user sees
 *
 * Owns the current view (the only mutable presentation state) and the two
 * user actions: full refresh and single-device test.
 *
 * - refresh: time probe + registry fetch in parallel, evaluate, render,
 *   swap the whole view. Errors replace the view with a banner, never a
 *   partial card set. Concurrent refreshes are serialized.
 * - test: same pipeline for one device, at most one in flight per device,
 *   only that card's status changes. Errors leave the card as it was.
 */

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::StatusConfig;
use crate::error::{ConfigError, FetchError};
use crate::liveness::LivenessPolicy;
use crate::registry::RegistryFetcher;
use crate::render::{render_all, update_card, CardView, DashboardState, RenderedDashboard};
use crate::state::{new_state, replace, snapshot, Shared};
use crate::time_source::TimeSource;

const USER_AGENT: &str = concat!("symbion-status/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DashboardView {
    Loading,
    Ready(RenderedDashboard),
    Failed { message: String },
}

impl DashboardView {
    pub fn rendered(&self) -> Option<&RenderedDashboard> {
        match self {
            DashboardView::Ready(rendered) => Some(rendered),
            _ => None,
        }
    }

    pub fn card(&self, device_id: &str) -> Option<&CardView> {
        self.rendered().and_then(|r| r.card(device_id))
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardView::Loading => write!(f, "Loading..."),
            DashboardView::Ready(rendered) => write!(f, "{rendered}"),
            DashboardView::Failed { message } => write!(f, "{message}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Online,
    Offline,
    /// Time probe or registry fetch failed; the card keeps its last status.
    Unknown,
    /// A test for this device is already running.
    Busy,
}

/// Transient result of a single-device test, shown as a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestReport {
    pub device_id: String,
    pub outcome: TestOutcome,
    pub message: String,
}

impl TestReport {
    fn new(device_id: &str, outcome: TestOutcome) -> Self {
        let message = match outcome {
            TestOutcome::Online => format!("Device {device_id} online"),
            TestOutcome::Offline => format!("Device {device_id} offline"),
            TestOutcome::Unknown => "Device status unknown".to_string(),
            TestOutcome::Busy => format!("Device {device_id} is already being tested"),
        };
        Self {
            device_id: device_id.to_string(),
            outcome,
            message,
        }
    }
}

/// Time source, registry fetcher and liveness policy, as one pipeline.
#[derive(Debug, Clone)]
pub struct StatusClient {
    time: TimeSource,
    registry: RegistryFetcher,
    policy: LivenessPolicy,
}

impl StatusClient {
    pub fn new(time: TimeSource, registry: RegistryFetcher, policy: LivenessPolicy) -> Self {
        Self {
            time,
            registry,
            policy,
        }
    }

    pub fn from_config(cfg: &StatusConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {e}")))?;

        let time = TimeSource::new(http.clone(), cfg.time_probe_url.clone());
        let registry = RegistryFetcher::new(http, cfg.registry_url.clone(), cfg.credential()?);
        Ok(Self::new(time, registry, cfg.liveness()))
    }

    /// Fetches time and registry concurrently and evaluates every device.
    pub async fn snapshot(&self) -> Result<DashboardState, FetchError> {
        let (reference_time, registry) = tokio::join!(self.time.reference_time(), self.registry.fetch());
        Ok(DashboardState::evaluate(registry?, reference_time, &self.policy))
    }

    /// Same pipeline as [`snapshot`](Self::snapshot), decided for one device.
    pub async fn check_device(&self, device_id: &str) -> Result<bool, FetchError> {
        let (reference_time, registry) = tokio::join!(self.time.reference_time(), self.registry.fetch());
        match registry?.get(device_id) {
            Some(record) => Ok(self.policy.is_online(reference_time, record)),
            None => {
                warn!(device_id, "device no longer in registry, reporting offline");
                Ok(false)
            }
        }
    }
}

pub struct Dashboard {
    client: StatusClient,
    control_port: u16,
    view: Shared<DashboardView>,
    in_flight: Shared<HashSet<String>>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl Dashboard {
    pub fn new(client: StatusClient, control_port: u16) -> Self {
        Self {
            client,
            control_port,
            view: new_state(DashboardView::Loading),
            in_flight: new_state(HashSet::new()),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_config(cfg: &StatusConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(StatusClient::from_config(cfg)?, cfg.control_port))
    }

    /// Snapshot of what is currently shown.
    pub fn view(&self) -> DashboardView {
        snapshot(&self.view)
    }

    /// Rebuilds the whole dashboard and returns the view it installed.
    pub async fn refresh(&self) -> DashboardView {
        let _gate = self.refresh_gate.lock().await;
        replace(&self.view, DashboardView::Loading);

        let mut next = match self.client.snapshot().await {
            Ok(state) => {
                let rendered = render_all(&state, self.control_port);
                info!(
                    total = rendered.summary.total,
                    online = rendered.summary.online,
                    offline = rendered.summary.offline,
                    "dashboard refreshed"
                );
                DashboardView::Ready(rendered)
            }
            Err(e) => {
                error!(error = %e, "failed to refresh dashboard");
                DashboardView::Failed {
                    message: format!("Error: {e}"),
                }
            }
        };

        // lock order: in_flight, then view
        let in_flight = self.in_flight.lock();
        if let DashboardView::Ready(rendered) = &mut next {
            for card in rendered.cards.iter_mut().filter(|c| in_flight.contains(&c.device_id)) {
                card.test.set_busy(true);
            }
        }
        replace(&self.view, next.clone());
        drop(in_flight);
        next
    }

    /// Re-checks one device and updates only its card.
    pub async fn test_device(&self, device_id: &str) -> TestReport {
        let Some(_guard) = InFlight::acquire(self, device_id) else {
            return TestReport::new(device_id, TestOutcome::Busy);
        };

        let outcome = match self.client.check_device(device_id).await {
            Ok(online) => {
                if !self.with_card(device_id, |card| update_card(card, online)) {
                    info!(device_id, "no card to update");
                }
                if online {
                    TestOutcome::Online
                } else {
                    TestOutcome::Offline
                }
            }
            Err(e) => {
                warn!(device_id, error = %e, "connection test failed");
                TestOutcome::Unknown
            }
        };

        TestReport::new(device_id, outcome)
    }

    fn with_card(&self, device_id: &str, f: impl FnOnce(&mut CardView)) -> bool {
        apply_to_card(&self.view, device_id, f)
    }
}

fn apply_to_card(view: &Shared<DashboardView>, device_id: &str, f: impl FnOnce(&mut CardView)) -> bool {
    let mut view = view.lock();
    let DashboardView::Ready(rendered) = &mut *view else {
        return false;
    };
    let Some(card) = rendered.card_mut(device_id) else {
        return false;
    };
    f(card);
    rendered.resummarize();
    true
}

/// Marks a device test as running; the trigger is re-enabled on drop.
struct InFlight {
    device_id: String,
    in_flight: Shared<HashSet<String>>,
    view: Shared<DashboardView>,
}

impl InFlight {
    fn acquire(dashboard: &Dashboard, device_id: &str) -> Option<Self> {
        let mut in_flight = dashboard.in_flight.lock();
        if !in_flight.insert(device_id.to_string()) {
            return None;
        }
        apply_to_card(&dashboard.view, device_id, |card| card.test.set_busy(true));
        drop(in_flight);
        Some(Self {
            device_id: device_id.to_string(),
            in_flight: dashboard.in_flight.clone(),
            view: dashboard.view.clone(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        in_flight.remove(&self.device_id);
        apply_to_card(&self.view, &self.device_id, |card| card.test.set_busy(false));
    }
}
