//! Session start: local identity, room list, and the one-time choice between
//! remote and local mode.

use crate::domain::{
    identity::Identity,
    room::{default_rooms, ChatRoom},
};

use super::{
    contracts::{IdentityStore, LocalRoomList, StoreError, SyncBackend},
    dual_store::DualStore,
};

const REMOTE_INIT_FAILED: &str = "SYNC_REMOTE_INIT_FAILED";
const IDENTITY_PERSIST_FAILED: &str = "IDENTITY_PERSIST_FAILED";
const DEFAULT_ROOM_SEED_FAILED: &str = "DEFAULT_ROOM_SEED_FAILED";

pub struct Initialized<R, L> {
    pub store: DualStore<R, L>,
    pub identity: Identity,
    pub rooms: Vec<ChatRoom>,
    /// Set when the remote was configured but failed; the store is local-only then.
    pub remote_failure: Option<StoreError>,
}

/// Establishes the identity and room list.
///
/// A remote room-list failure demotes the store to local-only for the rest of
/// the session. The default rooms are seeded when the remote list is empty or
/// when no local room list has ever been stored; a stored empty local list is
/// kept. Local storage failures never abort initialization.
pub fn initialize<R, L>(store: DualStore<R, L>, now_ms: i64) -> Initialized<R, L>
where
    R: SyncBackend,
    L: SyncBackend + IdentityStore + LocalRoomList,
{
    let identity = load_or_create_identity(store.local(), now_ms);

    let remote_rooms = store.remote().map(|remote| remote.list_rooms());
    let (store, listed, remote_failure) = match remote_rooms {
        Some(Ok(rooms)) => (store, Some(rooms).filter(|rooms| !rooms.is_empty()), None),
        Some(Err(error)) => {
            tracing::warn!(
                code = REMOTE_INIT_FAILED,
                error_code = error.code(),
                error = %error,
                "remote initialization failed; using local storage for this session"
            );
            let store = store.into_local_only();
            let rooms = local_rooms(&store);
            (store, rooms, Some(error))
        }
        None => {
            let rooms = local_rooms(&store);
            (store, rooms, None)
        }
    };

    let rooms = match listed {
        Some(rooms) => rooms,
        None => seed_default_rooms(&store),
    };

    tracing::info!(
        mode = store.mode().as_label(),
        rooms = rooms.len(),
        user_id = %identity.user_id,
        "chat session initialized"
    );

    Initialized {
        store,
        identity,
        rooms,
        remote_failure,
    }
}

fn load_or_create_identity<L: IdentityStore>(local: &L, now_ms: i64) -> Identity {
    if let Ok(Some(identity)) = local.load_identity() {
        return identity;
    }

    let identity = Identity::generate(now_ms);
    if let Err(error) = local.save_identity(&identity) {
        tracing::warn!(
            code = IDENTITY_PERSIST_FAILED,
            error = %error,
            "generated identity could not be persisted; it lasts for this session only"
        );
    }
    identity
}

fn local_rooms<R, L>(store: &DualStore<R, L>) -> Option<Vec<ChatRoom>>
where
    R: SyncBackend,
    L: SyncBackend + LocalRoomList,
{
    store.local().stored_rooms().ok().flatten()
}

fn seed_default_rooms<R: SyncBackend, L: SyncBackend>(store: &DualStore<R, L>) -> Vec<ChatRoom> {
    default_rooms()
        .into_iter()
        .map(|room| match store.insert_room(&room) {
            Ok(stored) => stored.value,
            Err(error) => {
                tracing::warn!(
                    code = DEFAULT_ROOM_SEED_FAILED,
                    room_id = %room.id,
                    error = %error,
                    "default room could not be stored; keeping it in memory"
                );
                room
            }
        })
        .collect()
}
