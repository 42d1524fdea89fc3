use crate::domain::{identity::local_id, room::ChatRoom};

use super::{
    contracts::{StoreError, SyncBackend},
    dual_store::{DualStore, Routed},
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateRoomError {
    #[error("room name is empty")]
    EmptyName,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Creates a room. The remote assigns the id; the local fallback keeps the
/// generated `room_<millis>_<suffix>` id.
pub fn create_room<R, L>(
    store: &DualStore<R, L>,
    name: &str,
    now_ms: i64,
) -> Result<Routed<ChatRoom>, CreateRoomError>
where
    R: SyncBackend,
    L: SyncBackend,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(CreateRoomError::EmptyName);
    }

    let draft = ChatRoom::new(local_id("room", now_ms), name);
    let created = store.insert_room(&draft)?;

    tracing::info!(
        room_id = %created.value.id,
        served_by = created.served_by.as_label(),
        "room created"
    );
    Ok(created)
}
