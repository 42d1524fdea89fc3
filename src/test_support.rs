use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::Sender,
        Arc, Mutex, MutexGuard,
    },
};

use crate::{
    domain::{
        calc::{self, CalcEntry},
        events::RoomEvent,
        message::ChatMessage,
        room::ChatRoom,
        settings::UserSettings,
    },
    infra::{local_store::LocalStore, stubs::MemoryKeyValueStore},
    usecases::contracts::{
        ChatStore, FeedError, HistoryStore, RoomFeed, RoomSubscription, SettingsStore, StoreError,
    },
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().expect("env lock should not be poisoned")
}

pub fn memory_local_store() -> LocalStore<MemoryKeyValueStore> {
    LocalStore::new(MemoryKeyValueStore::default())
}

#[derive(Debug, Default)]
struct RemoteState {
    rooms: Vec<ChatRoom>,
    messages: HashMap<String, Vec<ChatMessage>>,
    settings: HashMap<String, UserSettings>,
    history: HashMap<String, Vec<CalcEntry>>,
    fail_next: HashSet<String>,
    fail_all: bool,
    next_id: u64,
}

/// In-memory remote backend with captured calls and injectable failures.
#[derive(Debug, Default)]
pub struct StubRemote {
    state: Mutex<RemoteState>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubRemote {
    pub fn unreachable() -> Self {
        let remote = Self::default();
        remote.state().fail_all = true;
        remote
    }

    pub fn seed_room(&self, id: &str, name: &str) {
        self.state().rooms.push(ChatRoom::new(id, name));
    }

    pub fn fail_next(&self, operation: &str) {
        self.state().fail_next.insert(operation.to_owned());
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    pub fn stored_settings(&self, user_id: &str) -> Option<UserSettings> {
        self.state().settings.get(user_id).cloned()
    }

    pub fn stored_messages(&self, room_id: &str) -> Vec<ChatMessage> {
        self.state()
            .messages
            .get(room_id)
            .cloned()
            .unwrap_or_default()
    }

    fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().expect("stub remote lock")
    }

    fn enter(&self, operation: &str) -> Result<MutexGuard<'_, RemoteState>, StoreError> {
        self.calls
            .lock()
            .expect("stub remote calls lock")
            .push(operation.to_owned());

        let mut state = self.state();
        if state.fail_all || state.fail_next.remove(operation) {
            return Err(StoreError::Unavailable {
                message: format!("{operation} failed"),
            });
        }
        Ok(state)
    }
}

impl RemoteState {
    fn generate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("remote-{prefix}-{}", self.next_id)
    }
}

impl ChatStore for StubRemote {
    fn list_rooms(&self) -> Result<Vec<ChatRoom>, StoreError> {
        Ok(self.enter("list_rooms")?.rooms.clone())
    }

    fn insert_room(&self, draft: &ChatRoom) -> Result<ChatRoom, StoreError> {
        let mut state = self.enter("insert_room")?;
        let mut room = draft.clone();
        room.id = state.generate_id("room");
        state.rooms.push(room.clone());
        Ok(room)
    }

    fn update_room_last_message(
        &self,
        room_id: &str,
        text: &str,
        timestamp_ms: i64,
    ) -> Result<(), StoreError> {
        let mut state = self.enter("update_room_last_message")?;
        if let Some(room) = state.rooms.iter_mut().find(|room| room.id == room_id) {
            room.record_last_message(text, timestamp_ms);
        }
        Ok(())
    }

    fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let state = self.enter("list_messages")?;
        Ok(state.messages.get(room_id).cloned().unwrap_or_default())
    }

    fn insert_message(
        &self,
        room_id: &str,
        draft: &ChatMessage,
    ) -> Result<ChatMessage, StoreError> {
        let mut state = self.enter("insert_message")?;
        let mut message = draft.clone();
        message.id = state.generate_id("msg");
        state
            .messages
            .entry(room_id.to_owned())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    fn delete_message(&self, room_id: &str, message_id: &str) -> Result<(), StoreError> {
        let mut state = self.enter("delete_message")?;
        if let Some(messages) = state.messages.get_mut(room_id) {
            messages.retain(|message| message.id != message_id);
        }
        Ok(())
    }

    fn clear_messages(&self, room_id: &str) -> Result<(), StoreError> {
        self.enter("clear_messages")?.messages.remove(room_id);
        Ok(())
    }
}

impl SettingsStore for StubRemote {
    fn load_settings(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError> {
        Ok(self.enter("load_settings")?.settings.get(user_id).cloned())
    }

    fn save_settings(&self, user_id: &str, settings: &UserSettings) -> Result<(), StoreError> {
        self.enter("save_settings")?
            .settings
            .insert(user_id.to_owned(), settings.clone());
        Ok(())
    }
}

impl HistoryStore for StubRemote {
    fn list_calculations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CalcEntry>, StoreError> {
        let state = self.enter("list_calculations")?;
        let mut history = state.history.get(user_id).cloned().unwrap_or_default();
        history.truncate(limit);
        Ok(history)
    }

    fn insert_calculation(&self, user_id: &str, entry: &CalcEntry) -> Result<(), StoreError> {
        let mut state = self.enter("insert_calculation")?;
        let history = state.history.entry(user_id.to_owned()).or_default();
        calc::push_newest(history, entry.clone());
        Ok(())
    }

    fn clear_calculations(&self, user_id: &str) -> Result<(), StoreError> {
        self.enter("clear_calculations")?.history.remove(user_id);
        Ok(())
    }
}

/// Feed that hands out inert subscriptions and lets tests push events.
#[derive(Debug, Default, Clone)]
pub struct StubFeed {
    subscribed: Arc<Mutex<Vec<String>>>,
    senders: Arc<Mutex<Vec<(String, Sender<RoomEvent>)>>>,
    active: Arc<AtomicUsize>,
    reject: bool,
}

impl StubFeed {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn subscribed_rooms(&self) -> Vec<String> {
        self.subscribed.lock().expect("stub feed lock").clone()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Delivers `event` to every subscriber of its room.
    pub fn push(&self, event: RoomEvent) {
        let senders = self.senders.lock().expect("stub feed lock");
        for (room_id, sender) in senders.iter() {
            if *room_id == event.room_id {
                let _ = sender.send(event.clone());
            }
        }
    }
}

impl RoomFeed for StubFeed {
    fn subscribe(
        &self,
        room_id: &str,
        events: Sender<RoomEvent>,
    ) -> Result<Box<dyn RoomSubscription>, FeedError> {
        if self.reject {
            return Err(FeedError::Unavailable {
                message: "feed offline".to_owned(),
            });
        }

        self.subscribed
            .lock()
            .expect("stub feed lock")
            .push(room_id.to_owned());
        self.senders
            .lock()
            .expect("stub feed lock")
            .push((room_id.to_owned(), events));
        self.active.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(StubSubscription {
            room_id: room_id.to_owned(),
            active: Arc::clone(&self.active),
        }))
    }
}

struct StubSubscription {
    room_id: String,
    active: Arc<AtomicUsize>,
}

impl RoomSubscription for StubSubscription {
    fn room_id(&self) -> &str {
        &self.room_id
    }
}

impl Drop for StubSubscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
