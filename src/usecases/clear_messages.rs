use super::{
    contracts::{StoreError, SyncBackend},
    dual_store::{DualStore, Routed},
};

/// Removes every message of a room. Same view rule as single deletes: a
/// remote-served clear is reconciled by the live feed.
pub fn clear_messages<R, L>(
    store: &DualStore<R, L>,
    room_id: &str,
) -> Result<Routed<()>, StoreError>
where
    R: SyncBackend,
    L: SyncBackend,
{
    let routed = store.clear_messages(room_id)?;
    tracing::info!(
        room_id,
        served_by = routed.served_by.as_label(),
        "room messages cleared"
    );
    Ok(routed)
}
