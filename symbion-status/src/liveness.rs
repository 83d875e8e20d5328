//! Online/offline decision from a reference time and a heartbeat.

use crate::models::{DeviceRecord, DeviceRegistry};

/// Devices heartbeat every 120s; 10s on top absorbs network delay.
pub const DEFAULT_THRESHOLD_SECS: i64 = 130;

/// Tolerance window shared by the full refresh and the single-device test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    threshold_secs: i64,
}

impl LivenessPolicy {
    pub const fn new(threshold_secs: i64) -> Self {
        Self { threshold_secs }
    }

    pub fn threshold_secs(&self) -> i64 {
        self.threshold_secs
    }

    /// Online iff both timestamps are initialised (> -1) and the heartbeat is
    /// at most `threshold_secs` older than `reference`.
    pub fn is_online(&self, reference: i64, record: &DeviceRecord) -> bool {
        reference > -1
            && record.last_seen > -1
            && reference.saturating_sub(record.last_seen) <= self.threshold_secs
    }

    /// One decision per device, in registry order.
    pub fn evaluate(&self, reference: i64, registry: &DeviceRegistry) -> Vec<bool> {
        registry
            .iter()
            .map(|(_, record)| self.is_online(reference, record))
            .collect()
    }
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_SECS)
    }
}
