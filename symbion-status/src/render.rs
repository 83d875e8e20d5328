//! Card and summary view state.
//!
//! Everything here is a pure function of its inputs. The only mutation is
//! [`update_card`], which callers apply to a card they own; nothing in this
//! module touches shared state.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt;

use crate::liveness::LivenessPolicy;
use crate::models::{DeviceRecord, DeviceRegistry};

pub const TEST_IDLE_LABEL: &str = "Test Connection";
pub const TEST_BUSY_LABEL: &str = "Testing...";

/// Inputs of a full render: the fetched registry, the reference time used
/// for the liveness math and the resulting decisions (registry order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    pub registry: DeviceRegistry,
    pub reference_time: i64,
    pub decisions: Vec<bool>,
}

impl DashboardState {
    pub fn evaluate(registry: DeviceRegistry, reference_time: i64, policy: &LivenessPolicy) -> Self {
        let decisions = policy.evaluate(reference_time, &registry);
        Self {
            registry,
            reference_time,
            decisions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Success,
    Error,
}

/// Status affordance of a card: the only part a re-test may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub icon: &'static str,
    pub tone: Tone,
    pub pulse: bool,
}

impl StatusBadge {
    pub fn for_status(online: bool) -> Self {
        if online {
            Self {
                label: "Online",
                icon: "fa-check-circle",
                tone: Tone::Success,
                pulse: true,
            }
        } else {
            Self {
                label: "Offline",
                icon: "fa-times-circle",
                tone: Tone::Error,
                pulse: false,
            }
        }
    }
}

/// Secondary action of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestTrigger {
    pub device_id: String,
    pub label: &'static str,
    pub enabled: bool,
}

impl TestTrigger {
    pub fn idle(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: TEST_IDLE_LABEL,
            enabled: true,
        }
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.enabled = !busy;
        self.label = if busy { TEST_BUSY_LABEL } else { TEST_IDLE_LABEL };
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub device_id: String,
    pub ip: String,
    pub online: bool,
    pub badge: StatusBadge,
    /// Primary action: the device's own control panel.
    pub control_url: String,
    pub test: TestTrigger,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
}

impl DashboardSummary {
    pub fn from_cards(cards: &[CardView]) -> Self {
        let online = cards.iter().filter(|c| c.online).count();
        Self {
            total: cards.len(),
            online,
            offline: cards.len() - online,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDashboard {
    pub cards: Vec<CardView>,
    pub summary: DashboardSummary,
    /// Reference time the cards were evaluated against.
    pub last_updated: i64,
}

impl RenderedDashboard {
    pub fn card(&self, device_id: &str) -> Option<&CardView> {
        self.cards.iter().find(|c| c.device_id == device_id)
    }

    pub fn card_mut(&mut self, device_id: &str) -> Option<&mut CardView> {
        self.cards.iter_mut().find(|c| c.device_id == device_id)
    }

    /// Re-derives the counts after a targeted card update.
    pub fn resummarize(&mut self) {
        self.summary = DashboardSummary::from_cards(&self.cards);
    }
}

pub fn control_url(ip: &str, port: u16) -> String {
    format!("http://{ip}:{port}")
}

pub fn render_card(device_id: &str, record: &DeviceRecord, online: bool, control_port: u16) -> CardView {
    CardView {
        device_id: device_id.to_string(),
        ip: record.ip.clone(),
        online,
        badge: StatusBadge::for_status(online),
        control_url: control_url(&record.ip, control_port),
        test: TestTrigger::idle(device_id),
    }
}

pub fn render_all(state: &DashboardState, control_port: u16) -> RenderedDashboard {
    let cards: Vec<CardView> = state
        .registry
        .iter()
        .enumerate()
        .map(|(i, (id, record))| {
            let online = state.decisions.get(i).copied().unwrap_or(false);
            render_card(id, record, online, control_port)
        })
        .collect();
    let summary = DashboardSummary::from_cards(&cards);
    RenderedDashboard {
        cards,
        summary,
        last_updated: state.reference_time,
    }
}

/// Idempotent; identity, address and actions are left alone.
pub fn update_card(card: &mut CardView, online: bool) {
    card.online = online;
    card.badge = StatusBadge::for_status(online);
}

fn format_epoch(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.badge.pulse { "●" } else { "○" };
        writeln!(f, "{marker} {:<24} {}", self.device_id, self.badge.label)?;
        writeln!(f, "    address  {}", self.ip)?;
        write!(f, "    control  {}    [{}]", self.control_url, self.test.label)
    }
}

impl fmt::Display for RenderedDashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total: {}  Online: {}  Offline: {}    Last updated: {}",
            self.summary.total,
            self.summary.online,
            self.summary.offline,
            format_epoch(self.last_updated)
        )?;
        for card in &self.cards {
            writeln!(f)?;
            writeln!(f, "{card}")?;
        }
        Ok(())
    }
}
