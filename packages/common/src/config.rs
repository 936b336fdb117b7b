use std::path::PathBuf;

use serde::Deserialize;

/// Media storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root upload directory holding one subdirectory per bucket. Default: "./uploads".
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    /// Upper bound on a single filesystem call, in seconds. Default: 10.
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}
fn default_io_timeout_secs() -> u64 {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            io_timeout_secs: default_io_timeout_secs(),
        }
    }
}

/// Cleanup / garbage collection configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct CleanupConfig {
    /// Whether the periodic cleanup task runs. Default: false.
    /// On-demand runs through the admin API are unaffected.
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between periodic full runs. Default: 86400 (daily).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Resolved and dismissed reports older than this are purged. Default: 30.
    #[serde(default = "default_report_retention_days")]
    pub report_retention_days: i64,
    /// Minimum age of an unreferenced file before the global sweep may remove it.
    /// Default: 0 (no grace period).
    #[serde(default)]
    pub anonymous_grace_secs: u64,
}

fn default_interval_secs() -> u64 {
    86_400
}
fn default_report_retention_days() -> i64 {
    30
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
            report_retention_days: default_report_retention_days(),
            anonymous_grace_secs: 0,
        }
    }
}
