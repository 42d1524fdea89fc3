use super::message::ChatMessage;

/// Row-level change delivered by the live subscription feed for one room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomEvent {
    pub room_id: String,
    pub change: RoomChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomChange {
    Inserted(ChatMessage),
    Deleted { message_id: String },
}

impl RoomEvent {
    pub fn inserted(room_id: impl Into<String>, message: ChatMessage) -> Self {
        Self {
            room_id: room_id.into(),
            change: RoomChange::Inserted(message),
        }
    }

    pub fn deleted(room_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            change: RoomChange::Deleted {
                message_id: message_id.into(),
            },
        }
    }
}

/// Input to the chat shell loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Tick,
    QuitRequested,
    Input(String),
    Feed(RoomEvent),
}
