use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Last-seen value for entries that carry no usable heartbeat.
pub const LEGACY_LAST_SEEN: i64 = 0;

/// One monitored device: its address and the epoch second of its last heartbeat.
///
/// Two wire forms are accepted: a bare address string (legacy registries) or
/// an object `{"ip": "...", "timestamp": <epoch seconds>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub ip: String,
    #[serde(rename = "timestamp")]
    pub last_seen: i64,
}

impl DeviceRecord {
    pub fn new(ip: impl Into<String>, last_seen: i64) -> Self {
        Self { ip: ip.into(), last_seen }
    }

    pub fn legacy(ip: impl Into<String>) -> Self {
        Self::new(ip, LEGACY_LAST_SEEN)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordWire {
    Legacy(String),
    Full {
        ip: String,
        #[serde(default)]
        timestamp: Value,
    },
}

impl<'de> Deserialize<'de> for DeviceRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RecordWire::deserialize(deserializer)? {
            RecordWire::Legacy(ip) => DeviceRecord::legacy(ip),
            RecordWire::Full { ip, timestamp } => DeviceRecord::new(ip, heartbeat_secs(&timestamp)),
        })
    }
}

// heartbeat writers are not all ours: floats and numeric strings show up
fn heartbeat_secs(raw: &Value) -> i64 {
    let secs = match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.floor() as i64),
        _ => None,
    };
    secs.unwrap_or(LEGACY_LAST_SEEN)
}

/// Ordered device map, as fetched. Iteration order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceRegistry {
    devices: Vec<(String, DeviceRecord)>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.devices
            .iter()
            .find(|(id, _)| id == device_id)
            .map(|(_, record)| record)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceRecord)> {
        self.devices.iter().map(|(id, record)| (id.as_str(), record))
    }

    /// Adds a device at the end, or replaces the record in place if the id exists.
    pub fn insert(&mut self, device_id: impl Into<String>, record: DeviceRecord) {
        let device_id = device_id.into();
        match self.devices.iter_mut().find(|(id, _)| *id == device_id) {
            Some((_, existing)) => *existing = record,
            None => self.devices.push((device_id, record)),
        }
    }
}

impl FromIterator<(String, DeviceRecord)> for DeviceRegistry {
    fn from_iter<I: IntoIterator<Item = (String, DeviceRecord)>>(iter: I) -> Self {
        let mut registry = DeviceRegistry::new();
        for (id, record) in iter {
            registry.insert(id, record);
        }
        registry
    }
}
