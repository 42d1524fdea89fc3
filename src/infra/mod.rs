//! Infrastructure layer: config, logging, local persistence and background workers.

pub mod config;
pub mod contracts;
pub mod error;
pub mod kv_file;
pub mod local_store;
pub mod logging;
pub mod secrets;
pub mod storage_layout;
#[cfg(test)]
pub mod stubs;
pub mod sync_queue;

/// Returns the infra module name for smoke checks.
pub fn module_name() -> &'static str {
    "infra"
}
