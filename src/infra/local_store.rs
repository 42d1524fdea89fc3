//! Local fallback store: typed JSON entries over a [`KeyValueStore`].
//!
//! Unreadable or malformed entries are logged and treated as empty state.

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    domain::{
        calc::{self, CalcEntry},
        identity::Identity,
        message::ChatMessage,
        room::ChatRoom,
        settings::UserSettings,
    },
    infra::{contracts::KeyValueStore, error::AppError},
    usecases::contracts::{
        ChatStore, HistoryStore, IdentityStore, LocalRoomList, SettingsStore, StoreError,
    },
};

const USER_ID_KEY: &str = "chatUserId";
const USER_NAME_KEY: &str = "chatUserName";
const ROOMS_KEY: &str = "chatRooms";
const SETTINGS_KEY: &str = "userSettings";
const CALC_HISTORY_KEY: &str = "calcHistory";
const MESSAGES_KEY_PREFIX: &str = "chatMessages_";

const LOCAL_ENTRY_CORRUPT: &str = "LOCAL_STORE_ENTRY_CORRUPT";
const LOCAL_ENTRY_UNREADABLE: &str = "LOCAL_STORE_ENTRY_UNREADABLE";
const LOCAL_ROOM_MISSING: &str = "LOCAL_STORE_ROOM_MISSING";

pub struct LocalStore<K> {
    kv: K,
}

impl<K: KeyValueStore> LocalStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.kv.get(key) {
            Ok(raw) => decode(key, &raw?),
            Err(error) => {
                tracing::warn!(
                    code = LOCAL_ENTRY_UNREADABLE,
                    key,
                    error = %error,
                    "local entry unreadable; treating as empty"
                );
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = encode(key, value)?;
        self.kv.set(key, &raw).map_err(map_storage_error)
    }

    /// Read-modify-write of one entry under the store lock. `change` reports
    /// whether it modified the value; unchanged values are not written back.
    fn modify<T, F>(&self, key: &str, change: F) -> Result<bool, StoreError>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnOnce(&mut T) -> bool,
    {
        let mut change = Some(change);
        let mut changed = false;
        let mut encode_error = None;

        self.kv
            .update(key, &mut |raw| {
                let change = change.take()?;
                let mut value: T = raw.and_then(|raw| decode(key, raw)).unwrap_or_default();
                if !change(&mut value) {
                    return None;
                }
                changed = true;
                encode(key, &value)
                    .map_err(|error| encode_error = Some(error))
                    .ok()
            })
            .map_err(map_storage_error)?;

        match encode_error {
            Some(error) => Err(error),
            None => Ok(changed),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.kv.remove(key).map_err(map_storage_error)
    }

    fn messages(&self, room_id: &str) -> Vec<ChatMessage> {
        self.read_json(&messages_key(room_id)).unwrap_or_default()
    }

    fn history(&self) -> Vec<CalcEntry> {
        self.read_json(CALC_HISTORY_KEY).unwrap_or_default()
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(
                code = LOCAL_ENTRY_CORRUPT,
                key,
                error = %error,
                "local entry is not valid JSON; treating as empty"
            );
            None
        }
    }
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|error| StoreError::InvalidData {
        message: format!("failed to encode {key}: {error}"),
    })
}

fn messages_key(room_id: &str) -> String {
    format!("{MESSAGES_KEY_PREFIX}{room_id}")
}

fn map_storage_error(error: AppError) -> StoreError {
    StoreError::Storage {
        message: error.to_string(),
    }
}

impl<K: KeyValueStore> ChatStore for LocalStore<K> {
    fn list_rooms(&self) -> Result<Vec<ChatRoom>, StoreError> {
        Ok(self.read_json(ROOMS_KEY).unwrap_or_default())
    }

    fn insert_room(&self, draft: &ChatRoom) -> Result<ChatRoom, StoreError> {
        self.modify(ROOMS_KEY, |rooms: &mut Vec<ChatRoom>| {
            if rooms.iter().any(|room| room.id == draft.id) {
                return false;
            }
            rooms.push(draft.clone());
            true
        })?;
        Ok(draft.clone())
    }

    fn update_room_last_message(
        &self,
        room_id: &str,
        text: &str,
        timestamp_ms: i64,
    ) -> Result<(), StoreError> {
        let found = self.modify(ROOMS_KEY, |rooms: &mut Vec<ChatRoom>| {
            match rooms.iter_mut().find(|room| room.id == room_id) {
                Some(room) => {
                    room.record_last_message(text, timestamp_ms);
                    true
                }
                None => false,
            }
        })?;

        if !found {
            tracing::warn!(
                code = LOCAL_ROOM_MISSING,
                room_id,
                "room is not stored locally; its last message is not cached"
            );
        }
        Ok(())
    }

    fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let mut messages = self.messages(room_id);
        messages.sort_by_key(|message| message.timestamp);
        Ok(messages)
    }

    fn insert_message(
        &self,
        room_id: &str,
        draft: &ChatMessage,
    ) -> Result<ChatMessage, StoreError> {
        self.modify(&messages_key(room_id), |messages: &mut Vec<ChatMessage>| {
            messages.push(draft.clone());
            true
        })?;
        Ok(draft.clone())
    }

    fn delete_message(&self, room_id: &str, message_id: &str) -> Result<(), StoreError> {
        self.modify(&messages_key(room_id), |messages: &mut Vec<ChatMessage>| {
            match messages.iter().position(|message| message.id == message_id) {
                Some(index) => {
                    messages.remove(index);
                    true
                }
                None => false,
            }
        })?;
        Ok(())
    }

    fn clear_messages(&self, room_id: &str) -> Result<(), StoreError> {
        self.remove(&messages_key(room_id))
    }
}

// One identity per storage context, so the user id does not partition local entries.
impl<K: KeyValueStore> SettingsStore for LocalStore<K> {
    fn load_settings(&self, _user_id: &str) -> Result<Option<UserSettings>, StoreError> {
        Ok(self.read_json(SETTINGS_KEY))
    }

    fn save_settings(&self, _user_id: &str, settings: &UserSettings) -> Result<(), StoreError> {
        self.write_json(SETTINGS_KEY, settings)
    }
}

impl<K: KeyValueStore> HistoryStore for LocalStore<K> {
    fn list_calculations(
        &self,
        _user_id: &str,
        limit: usize,
    ) -> Result<Vec<CalcEntry>, StoreError> {
        let mut history = self.history();
        history.truncate(limit);
        Ok(history)
    }

    fn insert_calculation(&self, _user_id: &str, entry: &CalcEntry) -> Result<(), StoreError> {
        self.modify(CALC_HISTORY_KEY, |history: &mut Vec<CalcEntry>| {
            calc::push_newest(history, entry.clone());
            true
        })?;
        Ok(())
    }

    fn clear_calculations(&self, _user_id: &str) -> Result<(), StoreError> {
        self.remove(CALC_HISTORY_KEY)
    }
}

impl<K: KeyValueStore> LocalRoomList for LocalStore<K> {
    fn stored_rooms(&self) -> Result<Option<Vec<ChatRoom>>, StoreError> {
        Ok(self.read_json(ROOMS_KEY))
    }
}

impl<K: KeyValueStore> IdentityStore for LocalStore<K> {
    fn load_identity(&self) -> Result<Option<Identity>, StoreError> {
        let Some(user_id) = self.read_json::<String>(USER_ID_KEY) else {
            return Ok(None);
        };

        let user_name = self.read_json::<String>(USER_NAME_KEY);
        Ok(Some(Identity::new(user_id, user_name)))
    }

    fn save_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        self.write_json(USER_ID_KEY, &identity.user_id)?;
        self.write_json(USER_NAME_KEY, &identity.user_name)
    }
}
