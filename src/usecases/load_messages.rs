use crate::domain::message::ChatMessage;

use super::{
    contracts::{StoreError, SyncBackend},
    dual_store::{DualStore, Routed},
};

/// Full, time-ordered history of a room from whichever store serves the call.
pub fn load_messages<R, L>(
    store: &DualStore<R, L>,
    room_id: &str,
) -> Result<Routed<Vec<ChatMessage>>, StoreError>
where
    R: SyncBackend,
    L: SyncBackend,
{
    let mut routed = store.list_messages(room_id)?;
    routed.value.sort_by_key(|message| message.timestamp);

    tracing::debug!(
        room_id,
        count = routed.value.len(),
        served_by = routed.served_by.as_label(),
        "room history loaded"
    );
    Ok(routed)
}
