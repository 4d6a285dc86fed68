//! Worker configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::WorkerError;

/// Configuration for an anchor worker.
///
/// Can be loaded from a TOML file via [`WorkerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Deployment identity. Scopes the queue topic so independent
    /// deployments sharing a broker do not cross-consume.
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// How many times to re-read a record still marked `sending` before
    /// assuming the in-flight attempt is abandoned.
    #[serde(default = "default_status_poll_limit")]
    pub status_poll_limit: u32,

    /// Milliseconds between re-reads while a record is marked `sending`.
    /// Together with the poll limit this bounds how long another attempt
    /// is trusted (defaults: 30 × 60 s ≈ 30 minutes).
    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,

    /// One step of the failure backoff gate, in milliseconds. Before
    /// handling a message the worker sleeps `failure streak × unit`.
    #[serde(default = "default_failure_backoff_unit_ms")]
    pub failure_backoff_unit_ms: u64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_app_id() -> String {
    "anchor-dev".to_string()
}

fn default_status_poll_limit() -> u32 {
    30
}

fn default_status_poll_interval_ms() -> u64 {
    60_000
}

fn default_failure_backoff_unit_ms() -> u64 {
    1_000
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl WorkerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, WorkerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| WorkerError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, WorkerError> {
        toml::from_str(s).map_err(|e| WorkerError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("WorkerConfig is always serializable to TOML")
    }

    /// Wait between status re-reads of a `sending` record.
    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_millis(self.status_poll_interval_ms)
    }

    /// One step of the failure backoff gate.
    pub fn failure_backoff_unit(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_unit_ms)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            status_poll_limit: default_status_poll_limit(),
            status_poll_interval_ms: default_status_poll_interval_ms(),
            failure_backoff_unit_ms: default_failure_backoff_unit_ms(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
