//! Configuration for audit runs

use crate::error::{AuditError, Result};
use crate::resolve::SourceMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for one audit run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Features per file sampled for the type histogram and merged bbox
    #[serde(default = "default_max_scan_features")]
    pub max_scan_features: usize,

    /// Number of heavy features listed in the report
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Vertex estimate at or above which a feature raises an alert
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: u64,

    /// Per-request HTTP timeout
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Stop after this many auditable files (0 = no limit)
    #[serde(default)]
    pub max_files: usize,

    /// Files larger than this raise an advisory
    #[serde(default = "default_large_file_bytes")]
    pub large_file_bytes: u64,

    /// Worker threads; 1 runs sequentially
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_max_scan_features() -> usize {
    200
}

fn default_top_n() -> usize {
    20
}

fn default_alert_threshold() -> u64 {
    200_000
}

fn default_http_timeout() -> u64 {
    20
}

fn default_large_file_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_workers() -> usize {
    1
}

fn default_user_agent() -> String {
    format!("geoaudit/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_scan_features: default_max_scan_features(),
            top_n: default_top_n(),
            alert_threshold: default_alert_threshold(),
            http_timeout_secs: default_http_timeout(),
            max_files: 0,
            large_file_bytes: default_large_file_bytes(),
            workers: default_workers(),
            user_agent: default_user_agent(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AuditConfig =
            toml::from_str(&content).map_err(|e| AuditError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| AuditError::Config(e.to_string()))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Reject settings that cannot produce a meaningful run in `mode`.
    pub fn validate(&self, mode: &SourceMode) -> Result<()> {
        if self.max_scan_features == 0 {
            return Err(AuditError::Config(
                "max_scan_features must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(AuditError::Config("workers must be at least 1".to_string()));
        }

        if let SourceMode::Http { base_url } = mode {
            if self.http_timeout_secs == 0 {
                return Err(AuditError::Config(
                    "http_timeout_secs must be greater than zero".to_string(),
                ));
            }
            validate_base_url(base_url)?;
        }
        Ok(())
    }
}

/// HTTP mode needs an absolute http(s) base URL.
pub fn validate_base_url(base_url: &str) -> Result<()> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(AuditError::Config(
            "HTTP mode requires a base URL".to_string(),
        ));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| AuditError::Config(format!("invalid base URL '{}': {}", trimmed, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AuditError::Config(format!(
            "base URL must use http or https (got '{}')",
            other
        ))),
    }
}
