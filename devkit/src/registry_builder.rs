/*!
Builders for registry documents

Produces the gist-style document the dashboard fetches:
`{"files": {"devices.json": {"content": "<json map>"}}}`, with devices kept
in insertion order.
*/

use serde_json::{json, Map, Value};

pub const REGISTRY_FILE: &str = "devices.json";

#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    devices: Map<String, Value>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device with a heartbeat at `timestamp` (epoch seconds).
    pub fn device<S: Into<String>>(mut self, device_id: S, ip: &str, timestamp: i64) -> Self {
        self.devices
            .insert(device_id.into(), json!({ "ip": ip, "timestamp": timestamp }));
        self
    }

    /// Legacy entry: bare address string, no heartbeat.
    pub fn legacy_device<S: Into<String>>(mut self, device_id: S, ip: &str) -> Self {
        self.devices.insert(device_id.into(), Value::String(ip.to_string()));
        self
    }

    /// Arbitrary entry, for malformed-record cases.
    pub fn raw<S: Into<String>>(mut self, device_id: S, value: Value) -> Self {
        self.devices.insert(device_id.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// The device map as a JSON value.
    pub fn build(&self) -> Value {
        Value::Object(self.devices.clone())
    }

    /// The device map as embedded text.
    pub fn to_content(&self) -> String {
        self.build().to_string()
    }

    /// Full document wrapping the device map.
    pub fn build_document(&self) -> Value {
        document_with_content(&self.to_content())
    }
}

/// Document whose registry section carries `content` verbatim.
pub fn document_with_content(content: &str) -> Value {
    let mut files = Map::new();
    files.insert(
        REGISTRY_FILE.to_string(),
        json!({
            "filename": REGISTRY_FILE,
            "type": "application/json",
            "content": content,
        }),
    );
    json!({ "files": files })
}
