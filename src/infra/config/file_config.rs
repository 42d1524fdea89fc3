use std::path::PathBuf;

use serde::Deserialize;

use crate::infra::config::{AppConfig, LogConfig, RemoteConfig, StorageConfig, SyncConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub remote: Option<FileRemoteConfig>,
    pub storage: Option<FileStorageConfig>,
    pub sync: Option<FileSyncConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(remote) = self.remote {
            remote.merge_into(&mut config.remote);
        }

        if let Some(storage) = self.storage {
            storage.merge_into(&mut config.storage);
        }

        if let Some(sync) = self.sync {
            sync.merge_into(&mut config.sync);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file: Option<bool>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file) = self.file {
            config.file = file;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileRemoteConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub heartbeat_interval_ms: Option<u64>,
}

impl FileRemoteConfig {
    fn merge_into(self, config: &mut RemoteConfig) {
        if let Some(url) = self.url {
            config.url = Some(url);
        }

        if let Some(anon_key) = self.anon_key {
            config.anon_key = Some(anon_key);
        }

        if let Some(timeout_ms) = self.request_timeout_ms {
            config.request_timeout_ms = Some(timeout_ms);
        }

        if let Some(interval_ms) = self.heartbeat_interval_ms {
            config.heartbeat_interval_ms = interval_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileStorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl FileStorageConfig {
    fn merge_into(self, config: &mut StorageConfig) {
        if let Some(data_dir) = self.data_dir {
            config.data_dir = Some(data_dir);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileSyncConfig {
    pub queue_capacity: Option<usize>,
}

impl FileSyncConfig {
    fn merge_into(self, config: &mut SyncConfig) {
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
    }
}
