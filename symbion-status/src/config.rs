use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::liveness::{LivenessPolicy, DEFAULT_THRESHOLD_SECS};

pub const CONFIG_ENV: &str = "SYMBION_STATUS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "status.yaml";
pub const REGISTRY_URL_ENV: &str = "SYMBION_REGISTRY_URL";
pub const REGISTRY_TOKEN_ENV: &str = "SYMBION_REGISTRY_TOKEN";

pub const DEFAULT_TIME_PROBE_URL: &str = "https://api.github.com";
/// Port of the web control panel every device exposes.
pub const DEFAULT_CONTROL_PORT: u16 = 8000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StatusConfig {
    pub registry_url: String,
    /// Base64 of the `Authorization` header value. Obfuscation, not encryption:
    /// anyone holding the config can read the credential.
    pub registry_token: Option<String>,
    /// `null` disables the network clock.
    pub time_probe_url: Option<String>,
    pub threshold_secs: i64,
    pub control_port: u16,
    pub request_timeout_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            registry_url: String::new(),
            registry_token: None,
            time_probe_url: Some(DEFAULT_TIME_PROBE_URL.into()),
            threshold_secs: DEFAULT_THRESHOLD_SECS,
            control_port: DEFAULT_CONTROL_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl StatusConfig {
    pub fn from_yaml_str(txt: &str) -> Result<Self, ConfigError> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: StatusConfig = serde_yaml::from_str(txt)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold_secs < 0 {
            return Err(ConfigError::Invalid(format!(
                "threshold_secs must be >= 0, got {}",
                self.threshold_secs
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    /// URL and token from the environment win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(REGISTRY_URL_ENV) {
            if !url.trim().is_empty() {
                self.registry_url = url;
            }
        }
        if let Ok(token) = std::env::var(REGISTRY_TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.registry_token = Some(token);
            }
        }
    }

    pub fn credential(&self) -> Result<Option<String>, ConfigError> {
        self.registry_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(decode_credential)
            .transpose()
    }

    pub fn liveness(&self) -> LivenessPolicy {
        LivenessPolicy::new(self.threshold_secs)
    }
}

/// Reverses the config obfuscation: base64 of UTF-8 text.
pub fn decode_credential(encoded: &str) -> Result<String, ConfigError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn encode_credential(plain: &str) -> String {
    STANDARD.encode(plain.as_bytes())
}

pub async fn load_config() -> StatusConfig {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    load_config_from(Path::new(&path)).await
}

// fichier absent ou invalide => config par défaut, jamais d'échec
pub async fn load_config_from(path: &Path) -> StatusConfig {
    let mut cfg = if path.exists() {
        let txt = fs::read_to_string(path).await.unwrap_or_default();
        StatusConfig::from_yaml_str(&txt).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            StatusConfig::default()
        })
    } else {
        info!(path = %path.display(), "no config file, using defaults");
        StatusConfig::default()
    };
    cfg.apply_env_overrides();
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = StatusConfig::default();
        assert_eq!(cfg.threshold_secs, 130);
        assert_eq!(cfg.control_port, 8000);
        assert_eq!(cfg.time_probe_url.as_deref(), Some(DEFAULT_TIME_PROBE_URL));
        assert_eq!(cfg.liveness(), LivenessPolicy::default());
        assert_eq!(cfg.credential().unwrap(), None);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = StatusConfig::from_yaml_str(
            "registry_url: https://api.github.com/gists/abc\nthreshold_secs: 90\ntime_probe_url: null\n",
        )
        .unwrap();
        assert_eq!(cfg.registry_url, "https://api.github.com/gists/abc");
        assert_eq!(cfg.liveness().threshold_secs(), 90);
        assert_eq!(cfg.time_probe_url, None);
        assert_eq!(cfg.control_port, DEFAULT_CONTROL_PORT);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(StatusConfig::from_yaml_str("  \n").unwrap(), StatusConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            StatusConfig::from_yaml_str("threshold_secs: -5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StatusConfig::from_yaml_str("request_timeout_secs: 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StatusConfig::from_yaml_str("control_port: [1]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_credential_decoding() {
        let cfg = StatusConfig {
            registry_token: Some(encode_credential("token ghp_ünïcode")),
            ..StatusConfig::default()
        };
        assert_eq!(cfg.credential().unwrap().as_deref(), Some("token ghp_ünïcode"));
        assert_eq!(decode_credential("dG9rZW4gYWJj").unwrap(), "token abc");
        assert!(matches!(decode_credential("***"), Err(ConfigError::TokenEncoding(_))));
        assert!(matches!(decode_credential("/w=="), Err(ConfigError::TokenText(_))));
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let cfg = load_config_from(Path::new("/nonexistent/symbion/status.yaml")).await;
        assert_eq!(cfg.threshold_secs, DEFAULT_THRESHOLD_SECS);
    }
}
