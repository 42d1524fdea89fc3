use std::sync::Arc;

use crate::{
    domain::{identity::Identity, room::ChatRoom},
    infra::{
        config::AppConfig, kv_file::FileKeyValueStore, local_store::LocalStore,
        logging::LoggingGuard, storage_layout::StorageLayout,
    },
    remote::RestBackend,
};

use super::{contracts::RoomFeed, dual_store::DualStore};

pub type LocalBackend = LocalStore<FileKeyValueStore>;
pub type AppStore = DualStore<RestBackend, LocalBackend>;

pub struct AppContext {
    pub config: AppConfig,
    pub layout: StorageLayout,
    pub store: Arc<AppStore>,
    /// Present only while the session runs in remote mode.
    pub feed: Option<Arc<dyn RoomFeed>>,
    pub identity: Identity,
    pub rooms: Vec<ChatRoom>,
    _logging: LoggingGuard,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        layout: StorageLayout,
        session: SessionParts,
        logging: LoggingGuard,
    ) -> Self {
        Self {
            config,
            layout,
            store: Arc::new(session.store),
            feed: session.feed,
            identity: session.identity,
            rooms: session.rooms,
            _logging: logging,
        }
    }
}

/// Initialized storage, identity and rooms for one session.
pub struct SessionParts {
    pub store: AppStore,
    pub feed: Option<Arc<dyn RoomFeed>>,
    pub identity: Identity,
    pub rooms: Vec<ChatRoom>,
}
