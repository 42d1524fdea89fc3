use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    /// Write logs to a daily rolling file under the data dir instead of stderr.
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_owned(),
            file: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// No deadline when unset.
    pub request_timeout_ms: Option<u64>,
    pub heartbeat_interval_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            request_timeout_ms: None,
            heartbeat_interval_ms: 25_000,
        }
    }
}

impl RemoteConfig {
    /// Remote mode requires both the URL and the key.
    pub fn is_configured(&self) -> bool {
        is_present(self.url.as_deref()) && is_present(self.anon_key.as_deref())
    }
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    pub queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}
