//! Reference clock for liveness math.
//!
//! Heartbeats are stamped by the devices' own (network-synced) clocks, so a
//! wrong local clock would flip every card. When a probe URL is configured the
//! `Date` header of a `HEAD` response is used instead; any failure falls back
//! to the local clock without surfacing an error.

use chrono::{DateTime, Utc};
use reqwest::header::DATE;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
enum TimeUnavailable {
    #[error("time probe failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("time probe response has no Date header")]
    MissingHeader,
    #[error("unparseable Date header {0:?}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct TimeSource {
    client: reqwest::Client,
    probe_url: Option<String>,
}

impl TimeSource {
    pub fn new(client: reqwest::Client, probe_url: Option<String>) -> Self {
        Self { client, probe_url }
    }

    /// Local clock only.
    pub fn local() -> Self {
        Self::new(reqwest::Client::new(), None)
    }

    pub fn probe_url(&self) -> Option<&str> {
        self.probe_url.as_deref()
    }

    /// Current time in epoch seconds. Never fails.
    pub async fn reference_time(&self) -> i64 {
        let Some(url) = self.probe_url.as_deref() else {
            return local_now();
        };
        match self.probe(url).await {
            Ok(ts) => {
                debug!(url, ts, "reference time from network probe");
                ts
            }
            Err(e) => {
                warn!(url, error = %e, "time probe unavailable, using local clock");
                local_now()
            }
        }
    }

    // status code is ignored: an error page still carries the server clock
    async fn probe(&self, url: &str) -> Result<i64, TimeUnavailable> {
        let resp = self.client.head(url).send().await?;
        let raw = resp.headers().get(DATE).ok_or(TimeUnavailable::MissingHeader)?;
        let text = raw
            .to_str()
            .map_err(|_| TimeUnavailable::Malformed(format!("{raw:?}")))?;
        parse_http_date(text).ok_or_else(|| TimeUnavailable::Malformed(text.to_string()))
    }
}

pub fn local_now() -> i64 {
    Utc::now().timestamp()
}

/// IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`) to epoch seconds.
pub fn parse_http_date(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.timestamp())
}
