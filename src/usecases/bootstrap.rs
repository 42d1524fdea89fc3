use std::{
    path::Path,
    sync::{mpsc, Arc},
};

use anyhow::Result;

use crate::{
    domain::identity::now_ms,
    infra::{
        self,
        config::{AppConfig, RemoteConfig},
        error::AppError,
        kv_file::FileKeyValueStore,
        local_store::LocalStore,
        storage_layout::StorageLayout,
    },
    remote::{self, RealtimeFeed, RestBackend},
    ui::event_source::LineEventSource,
};

use super::{
    chat_session::ChatSession,
    chat_shell::ChatShell,
    context::{AppContext, AppStore, LocalBackend, SessionParts},
    contracts::{AppEventSource, RoomFeed, ShellOrchestrator, StoreError},
    dual_store::DualStore,
    initialize::initialize,
};

const REMOTE_SETUP_FAILED: &str = "SYNC_REMOTE_SETUP_FAILED";

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config = infra::config::load(config_path)?;
    let layout = StorageLayout::resolve(config.storage.data_dir.as_deref())?;
    layout.ensure_dirs()?;
    let logging = infra::logging::init(&config.logging, &layout)?;

    let session = open_session(&config, &layout)?;
    Ok(AppContext::new(config, layout, session, logging))
}

pub fn open_session(config: &AppConfig, layout: &StorageLayout) -> Result<SessionParts, AppError> {
    let local = LocalStore::new(FileKeyValueStore::open(&layout.store_dir)?);
    let (store, feed) = select_backend(&config.remote, local);

    let initialized = initialize(store, now_ms());
    let feed = if initialized.remote_failure.is_some() {
        None
    } else {
        feed
    };

    Ok(SessionParts {
        store: initialized.store,
        feed,
        identity: initialized.identity,
        rooms: initialized.rooms,
    })
}

/// Remote mode when both remote settings are present and the clients can be
/// built; local-only otherwise.
fn select_backend(
    remote: &RemoteConfig,
    local: LocalBackend,
) -> (AppStore, Option<Arc<dyn RoomFeed>>) {
    if !remote.is_configured() {
        tracing::info!("remote backend not configured; using local storage");
        return (DualStore::local_only(local), None);
    }

    let clients = remote::build_runtime().map(Arc::new).and_then(|rt| {
        let rest = RestBackend::new(remote, Arc::clone(&rt))?;
        let feed = RealtimeFeed::new(remote, rt).map_err(|error| StoreError::Unavailable {
            message: error.to_string(),
        })?;
        Ok((rest, feed))
    });

    match clients {
        Ok((rest, feed)) => {
            let feed: Arc<dyn RoomFeed> = Arc::new(feed);
            (DualStore::with_remote(rest, local), Some(feed))
        }
        Err(error) => {
            tracing::warn!(
                code = REMOTE_SETUP_FAILED,
                error = %error,
                "remote backend could not be set up; using local storage"
            );
            (DualStore::local_only(local), None)
        }
    }
}

pub struct ShellComposition {
    pub event_source: Box<dyn AppEventSource>,
    pub orchestrator: Box<dyn ShellOrchestrator>,
}

/// Wires the chat shell: stdin plus the live feed channel on one side, the
/// chat session opened on `room` on the other.
pub fn compose_shell(context: &AppContext, room: &str) -> Result<ShellComposition> {
    let (feed_tx, feed_rx) = mpsc::channel();
    let session = ChatSession::new(
        Arc::clone(&context.store),
        context.feed.clone(),
        feed_tx,
        context.identity.clone(),
        context.rooms.clone(),
    );
    let mut shell = ChatShell::new(session);
    shell.open(room);

    Ok(ShellComposition {
        event_source: Box::new(LineEventSource::from_stdin(feed_rx)?),
        orchestrator: Box::new(shell),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::{contracts::ChatStore, dual_store::StoreMode};

    fn layout_in(dir: &Path) -> StorageLayout {
        let layout = StorageLayout::resolve(Some(dir)).expect("layout");
        layout.ensure_dirs().expect("dirs");
        layout
    }

    #[test]
    fn unconfigured_remote_opens_local_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_in(dir.path());

        let session = open_session(&AppConfig::default(), &layout).expect("session");

        assert_eq!(session.store.mode(), StoreMode::Local);
        assert!(session.feed.is_none());
        assert_eq!(session.rooms.len(), 3);
        assert!(layout.store_dir.join("chatRooms.json").exists());
    }

    #[test]
    fn identity_survives_restarts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_in(dir.path());

        let first = open_session(&AppConfig::default(), &layout).expect("first session");
        let second = open_session(&AppConfig::default(), &layout).expect("second session");

        assert_eq!(first.identity, second.identity);
    }

    #[test]
    fn unreachable_remote_demotes_to_local_without_feed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = layout_in(dir.path());
        let mut config = AppConfig::default();
        config.remote.url = Some("http://127.0.0.1:9".to_owned());
        config.remote.anon_key = Some("anon".to_owned());
        config.remote.request_timeout_ms = Some(500);

        let session = open_session(&config, &layout).expect("session");

        assert_eq!(session.store.mode(), StoreMode::Local);
        assert!(session.feed.is_none());
        assert_eq!(
            session.store.local().list_rooms().expect("local rooms").len(),
            3
        );
    }
}
