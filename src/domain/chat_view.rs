use super::{
    events::{RoomChange, RoomEvent},
    message::ChatMessage,
    room::ChatRoom,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatUiState {
    Empty,
    Loading,
    Ready,
    Error,
}

/// In-memory view model kept consistent with whichever store is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatViewState {
    rooms: Vec<ChatRoom>,
    room_id: Option<String>,
    messages: Vec<ChatMessage>,
    ui_state: ChatUiState,
}

impl Default for ChatViewState {
    fn default() -> Self {
        Self {
            rooms: Vec::new(),
            room_id: None,
            messages: Vec::new(),
            ui_state: ChatUiState::Empty,
        }
    }
}

impl ChatViewState {
    pub fn rooms(&self) -> &[ChatRoom] {
        &self.rooms
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn current_room(&self) -> Option<&ChatRoom> {
        let room_id = self.room_id.as_deref()?;
        self.rooms.iter().find(|room| room.id == room_id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn ui_state(&self) -> ChatUiState {
        self.ui_state
    }

    pub fn set_rooms(&mut self, rooms: Vec<ChatRoom>) {
        self.rooms = rooms;
    }

    pub fn add_room(&mut self, room: ChatRoom) {
        if !self.rooms.iter().any(|existing| existing.id == room.id) {
            self.rooms.push(room);
        }
    }

    /// Resolves `room` by id, then by case-insensitive name, falling back to
    /// the first known room.
    pub fn resolve_room_id(&self, room: &str) -> Option<String> {
        self.rooms
            .iter()
            .find(|known| known.id == room)
            .or_else(|| {
                self.rooms
                    .iter()
                    .find(|known| known.name.eq_ignore_ascii_case(room.trim()))
            })
            .or_else(|| self.rooms.first())
            .map(|room| room.id.clone())
    }

    /// Resolves a full message id or the unique loaded message whose id ends
    /// with `query`.
    pub fn resolve_message_id(&self, query: &str) -> Option<String> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(exact) = self.messages.iter().find(|message| message.id == query) {
            return Some(exact.id.clone());
        }

        let mut matches = self
            .messages
            .iter()
            .filter(|message| message.id.ends_with(query));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.id.clone()),
            _ => None,
        }
    }

    pub fn record_last_message(&mut self, room_id: &str, text: &str, timestamp_ms: i64) {
        if let Some(room) = self.rooms.iter_mut().find(|room| room.id == room_id) {
            room.record_last_message(text, timestamp_ms);
        }
    }

    pub fn set_loading(&mut self, room_id: String) {
        self.room_id = Some(room_id);
        self.messages.clear();
        self.ui_state = ChatUiState::Loading;
    }

    pub fn set_ready(&mut self, messages: Vec<ChatMessage>) {
        // Feed events may have landed while loading; keep them after the fetched history.
        let pending = std::mem::take(&mut self.messages);
        self.messages = messages;
        for message in pending {
            self.push_message(message);
        }
        self.ui_state = ChatUiState::Ready;
    }

    pub fn set_error(&mut self) {
        self.ui_state = ChatUiState::Error;
    }

    /// Appends `message` unless one with the same id is already present.
    pub fn push_message(&mut self, message: ChatMessage) -> bool {
        if self.messages.iter().any(|existing| existing.id == message.id) {
            return false;
        }

        self.messages.push(message);
        true
    }

    /// Removes the single message with `message_id`.
    pub fn remove_message(&mut self, message_id: &str) -> bool {
        match self
            .messages
            .iter()
            .position(|message| message.id == message_id)
        {
            Some(index) => {
                self.messages.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Folds a live feed event into the view. Events for other rooms are ignored.
    pub fn apply_room_event(&mut self, event: RoomEvent) -> bool {
        if self.room_id.as_deref() != Some(event.room_id.as_str()) {
            return false;
        }

        match event.change {
            RoomChange::Inserted(message) => {
                let text = message.message.clone();
                let timestamp = message.timestamp;
                let added = self.push_message(message);
                if added {
                    self.record_last_message(&event.room_id, &text, timestamp);
                }
                added
            }
            RoomChange::Deleted { message_id } => self.remove_message(&message_id),
        }
    }
}
