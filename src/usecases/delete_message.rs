use super::{
    contracts::{StoreError, SyncBackend},
    dual_store::{DualStore, Routed},
};

/// Deletes one message.
///
/// When the remote served the call the caller must not touch its view; the
/// live feed delivers the deletion.
pub fn delete_message<R, L>(
    store: &DualStore<R, L>,
    room_id: &str,
    message_id: &str,
) -> Result<Routed<()>, StoreError>
where
    R: SyncBackend,
    L: SyncBackend,
{
    let routed = store.delete_message(room_id, message_id)?;
    tracing::debug!(
        room_id,
        message_id,
        served_by = routed.served_by.as_label(),
        "message deleted"
    );
    Ok(routed)
}
