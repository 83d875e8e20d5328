//! Symbion Status - online/offline dashboard for self-hosted devices
//!
//! Devices publish a heartbeat timestamp into a shared registry document.
//! This crate fetches that registry, decides liveness against a reference
//! clock and renders one card per device:
//! - `time_source`: network-derived reference time with local fallback
//! - `registry`: registry document fetch and parsing
//! - `liveness`: threshold policy shared by refresh and per-device test
//! - `render`: pure card/summary view state
//! - `dashboard`: refresh and test actions over the current view

pub mod config;
pub mod dashboard;
pub mod error;
pub mod liveness;
pub mod models;
pub mod registry;
pub mod render;
pub mod state;
pub mod time_source;

pub use config::StatusConfig;
pub use dashboard::{Dashboard, DashboardView, StatusClient, TestOutcome, TestReport};
pub use error::{ConfigError, FetchError};
pub use liveness::{LivenessPolicy, DEFAULT_THRESHOLD_SECS};
pub use models::{DeviceRecord, DeviceRegistry};
pub use render::{CardView, DashboardState, DashboardSummary, RenderedDashboard};
