//! Device registry fetch.
//!
//! The registry lives in a gist-style document: `files["devices.json"].content`
//! holds the JSON-encoded `deviceId -> record` map. A fetch either returns the
//! whole registry or an error; there is no retry here, the user re-triggers.

use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

use crate::error::FetchError;
use crate::models::{DeviceRecord, DeviceRegistry};

/// Section of the document carrying the registry.
pub const REGISTRY_FILE: &str = "devices.json";

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    files: Map<String, Value>,
}

#[derive(Clone)]
pub struct RegistryFetcher {
    client: reqwest::Client,
    url: String,
    credential: Option<String>,
}

impl RegistryFetcher {
    /// `credential` is sent verbatim as the `Authorization` header.
    pub fn new(client: reqwest::Client, url: impl Into<String>, credential: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            credential,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<DeviceRegistry, FetchError> {
        let mut req = self.client.get(&self.url);
        if let Some(credential) = &self.credential {
            req = req.header(AUTHORIZATION, credential.as_str());
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        let registry = parse_document(&body)?;
        debug!(url = %self.url, devices = registry.len(), "registry fetched");
        Ok(registry)
    }
}

impl fmt::Debug for RegistryFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryFetcher")
            .field("url", &self.url)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Locates the registry section in a fetched document and parses it.
pub fn parse_document(body: &str) -> Result<DeviceRegistry, FetchError> {
    let doc: RegistryDocument = serde_json::from_str(body)
        .map_err(|e| FetchError::Format(format!("unexpected registry document: {e}")))?;

    let content = doc
        .files
        .get(REGISTRY_FILE)
        .and_then(|file| file.get("content"))
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| FetchError::Format("No valid device data found".to_string()))?;

    parse_registry(content)
}

/// Parses the embedded `deviceId -> record` map, keeping document order.
pub fn parse_registry(content: &str) -> Result<DeviceRegistry, FetchError> {
    let entries: Map<String, Value> = serde_json::from_str(content)?;
    entries
        .into_iter()
        .map(|(id, raw)| match DeviceRecord::deserialize(raw) {
            Ok(record) => Ok((id, record)),
            Err(e) => Err(FetchError::Format(format!("invalid record for device {id}: {e}"))),
        })
        .collect()
}
