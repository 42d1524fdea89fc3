//! Sending a chat message and refreshing the room's last-message cache.

use crate::domain::{
    identity::{local_id, Identity},
    message::ChatMessage,
};

use super::{
    contracts::{StoreError, SyncBackend},
    dual_store::{DualStore, Routed},
};

const ROOM_LAST_MESSAGE_UPDATE_FAILED: &str = "ROOM_LAST_MESSAGE_UPDATE_FAILED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub room_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendMessageError {
    /// Message text is empty after trimming whitespace.
    #[error("message is empty")]
    EmptyMessage,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stores a message from `identity` and updates the room's denormalized last
/// message through the same dual path.
///
/// The returned message is the stored version: remote backends assign their
/// own id and timestamp.
pub fn send_message<R, L>(
    store: &DualStore<R, L>,
    identity: &Identity,
    command: SendMessageCommand,
    now_ms: i64,
) -> Result<Routed<ChatMessage>, SendMessageError>
where
    R: SyncBackend,
    L: SyncBackend,
{
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    let draft = ChatMessage {
        id: local_id("msg", now_ms),
        sender: identity.user_id.clone(),
        sender_name: identity.user_name.clone(),
        message: text.to_owned(),
        timestamp: now_ms,
        avatar: Some(identity.avatar()),
    };

    let stored = store.insert_message(&command.room_id, &draft)?;

    if let Err(error) = store.update_room_last_message(
        &command.room_id,
        &stored.value.message,
        stored.value.timestamp,
    ) {
        tracing::warn!(
            code = ROOM_LAST_MESSAGE_UPDATE_FAILED,
            room_id = %command.room_id,
            error = %error,
            "message stored but room last message was not updated"
        );
    }

    Ok(stored)
}
