//! Remote backend: PostgREST tables and the realtime message feed.

pub mod realtime;
pub mod rest;
pub mod rows;

use tokio::runtime::{Builder, Runtime};

use crate::usecases::contracts::StoreError;

pub use realtime::RealtimeFeed;
pub use rest::RestBackend;

const REMOTE_WORKER_THREADS: usize = 2;

/// Runtime shared by the REST backend and the realtime monitors.
pub fn build_runtime() -> Result<Runtime, StoreError> {
    Builder::new_multi_thread()
        .worker_threads(REMOTE_WORKER_THREADS)
        .thread_name("superapp-remote")
        .enable_all()
        .build()
        .map_err(|error| StoreError::Unavailable {
            message: format!("failed to initialize async runtime: {error}"),
        })
}

/// Returns the remote module name for smoke checks.
pub fn module_name() -> &'static str {
    "remote"
}
