use std::sync::mpsc::Sender;

use anyhow::Result;

use crate::domain::{
    calc::CalcEntry, events::AppEvent, events::RoomEvent, identity::Identity,
    message::ChatMessage, room::ChatRoom, settings::UserSettings, shell_state::ShellOutput,
};

/// Errors surfaced by either backing store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backend could not be reached (transport failure, runtime unavailable).
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
    /// Backend answered with a non-success status.
    #[error("store rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },
    /// Payload did not match the expected shape.
    #[error("store returned invalid data: {message}")]
    InvalidData { message: String },
    /// Local persistence failed (disk full, permissions, lock).
    #[error("local storage failed: {message}")]
    Storage { message: String },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "STORE_UNAVAILABLE",
            Self::Rejected { .. } => "STORE_REJECTED",
            Self::InvalidData { .. } => "STORE_INVALID_DATA",
            Self::Storage { .. } => "STORE_LOCAL_IO",
        }
    }
}

/// Rooms and messages.
pub trait ChatStore {
    fn list_rooms(&self) -> Result<Vec<ChatRoom>, StoreError>;

    /// Stores a room. Backends that generate ids return the stored version.
    fn insert_room(&self, draft: &ChatRoom) -> Result<ChatRoom, StoreError>;

    fn update_room_last_message(
        &self,
        room_id: &str,
        text: &str,
        timestamp_ms: i64,
    ) -> Result<(), StoreError>;

    /// Messages of a room, ordered by time ascending.
    fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    fn insert_message(
        &self,
        room_id: &str,
        draft: &ChatMessage,
    ) -> Result<ChatMessage, StoreError>;

    fn delete_message(&self, room_id: &str, message_id: &str) -> Result<(), StoreError>;

    fn clear_messages(&self, room_id: &str) -> Result<(), StoreError>;
}

pub trait SettingsStore {
    fn load_settings(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError>;

    /// Whole-record upsert keyed by user id.
    fn save_settings(&self, user_id: &str, settings: &UserSettings) -> Result<(), StoreError>;
}

pub trait HistoryStore {
    /// Newest first, at most `limit` entries.
    fn list_calculations(&self, user_id: &str, limit: usize)
        -> Result<Vec<CalcEntry>, StoreError>;

    fn insert_calculation(&self, user_id: &str, entry: &CalcEntry) -> Result<(), StoreError>;

    fn clear_calculations(&self, user_id: &str) -> Result<(), StoreError>;
}

/// Full storage capability shared by the remote backend and the local fallback.
pub trait SyncBackend: ChatStore + SettingsStore + HistoryStore + Send + Sync {}

impl<T> SyncBackend for T where T: ChatStore + SettingsStore + HistoryStore + Send + Sync {}

/// Device-local identity persistence.
pub trait IdentityStore {
    fn load_identity(&self) -> Result<Option<Identity>, StoreError>;
    fn save_identity(&self, identity: &Identity) -> Result<(), StoreError>;
}

/// The local room list as stored, telling a missing entry apart from an
/// empty one.
pub trait LocalRoomList {
    fn stored_rooms(&self) -> Result<Option<Vec<ChatRoom>>, StoreError>;
}

/// Open live subscription. Dropping it tears the channel down.
pub trait RoomSubscription: Send {
    fn room_id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("live feed unavailable: {message}")]
    Unavailable { message: String },
}

/// Push channel of row-level message changes for a room.
pub trait RoomFeed: Send + Sync {
    fn subscribe(
        &self,
        room_id: &str,
        events: Sender<RoomEvent>,
    ) -> Result<Box<dyn RoomSubscription>, FeedError>;
}

pub trait AppEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>>;
}

pub trait ShellOrchestrator {
    fn is_running(&self) -> bool;
    fn handle_event(&mut self, event: AppEvent) -> Result<()>;
    fn take_output(&mut self) -> Vec<ShellOutput>;
}
