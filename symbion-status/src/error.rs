//! Error taxonomy for the status dashboard.
//!
//! `FetchError` covers everything that can abort a registry fetch. The time
//! probe has its own error type, private to `time_source`, because a failed
//! probe always degrades to the local clock and never reaches the caller.

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout, broken body...
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(u16),
    /// Document reachable but not shaped like a device registry.
    #[error("{0}")]
    Format(String),
    #[error("invalid registry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Transport and HTTP status failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status(_))
    }

    /// Missing section or content that is not a registry.
    pub fn is_format(&self) -> bool {
        matches!(self, FetchError::Format(_) | FetchError::Json(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("registry token is not valid base64: {0}")]
    TokenEncoding(#[from] base64::DecodeError),
    #[error("registry token does not decode to UTF-8 text")]
    TokenText(#[from] std::string::FromUtf8Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}
