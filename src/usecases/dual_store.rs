//! Dual-mode persistence adapter.
//!
//! The mode is picked once (remote when configured, local otherwise) and is
//! immutable afterwards; the only transition is [`DualStore::into_local_only`],
//! which consumes the store and is used when remote initialization fails.
//! In remote mode every call is attempted remotely first and, on failure, the
//! local equivalent is run instead. There is no retry and no replay of
//! local writes once the remote recovers.

use std::sync::Arc;

use crate::domain::{calc::CalcEntry, message::ChatMessage, room::ChatRoom};

use super::contracts::{StoreError, SyncBackend};

const REMOTE_OPERATION_FAILED: &str = "SYNC_REMOTE_OPERATION_FAILED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Remote,
    Local,
}

impl StoreMode {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

enum Backend<R> {
    Remote(Arc<R>),
    LocalOnly,
}

/// Result of a routed call together with the store that served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed<T> {
    pub value: T,
    pub served_by: StoreMode,
}

impl<T> Routed<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Routed<U> {
        Routed {
            value: f(self.value),
            served_by: self.served_by,
        }
    }
}

pub struct DualStore<R, L> {
    backend: Backend<R>,
    local: L,
}

impl<R, L> DualStore<R, L>
where
    R: SyncBackend,
    L: SyncBackend,
{
    pub fn with_remote(remote: R, local: L) -> Self {
        Self {
            backend: Backend::Remote(Arc::new(remote)),
            local,
        }
    }

    pub fn local_only(local: L) -> Self {
        Self {
            backend: Backend::LocalOnly,
            local,
        }
    }

    pub fn mode(&self) -> StoreMode {
        match self.backend {
            Backend::Remote(_) => StoreMode::Remote,
            Backend::LocalOnly => StoreMode::Local,
        }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> Option<&Arc<R>> {
        match &self.backend {
            Backend::Remote(remote) => Some(remote),
            Backend::LocalOnly => None,
        }
    }

    /// Drops the remote backend for the rest of the session.
    pub fn into_local_only(self) -> Self {
        Self::local_only(self.local)
    }

    fn route<T>(
        &self,
        operation: &'static str,
        remote_call: impl FnOnce(&R) -> Result<T, StoreError>,
        local_call: impl FnOnce(&L) -> Result<T, StoreError>,
    ) -> Result<Routed<T>, StoreError> {
        if let Backend::Remote(remote) = &self.backend {
            match remote_call(remote) {
                Ok(value) => {
                    return Ok(Routed {
                        value,
                        served_by: StoreMode::Remote,
                    })
                }
                Err(error) => {
                    tracing::warn!(
                        code = REMOTE_OPERATION_FAILED,
                        operation,
                        error_code = error.code(),
                        error = %error,
                        "remote operation failed; using local store"
                    );
                }
            }
        }

        local_call(&self.local).map(|value| Routed {
            value,
            served_by: StoreMode::Local,
        })
    }

    pub fn list_rooms(&self) -> Result<Routed<Vec<ChatRoom>>, StoreError> {
        self.route("list_rooms", |r| r.list_rooms(), |l| l.list_rooms())
    }

    pub fn insert_room(&self, draft: &ChatRoom) -> Result<Routed<ChatRoom>, StoreError> {
        self.route(
            "insert_room",
            |r| r.insert_room(draft),
            |l| l.insert_room(draft),
        )
    }

    pub fn update_room_last_message(
        &self,
        room_id: &str,
        text: &str,
        timestamp_ms: i64,
    ) -> Result<Routed<()>, StoreError> {
        self.route(
            "update_room_last_message",
            |r| r.update_room_last_message(room_id, text, timestamp_ms),
            |l| l.update_room_last_message(room_id, text, timestamp_ms),
        )
    }

    pub fn list_messages(&self, room_id: &str) -> Result<Routed<Vec<ChatMessage>>, StoreError> {
        self.route(
            "list_messages",
            |r| r.list_messages(room_id),
            |l| l.list_messages(room_id),
        )
    }

    pub fn insert_message(
        &self,
        room_id: &str,
        draft: &ChatMessage,
    ) -> Result<Routed<ChatMessage>, StoreError> {
        self.route(
            "insert_message",
            |r| r.insert_message(room_id, draft),
            |l| l.insert_message(room_id, draft),
        )
    }

    pub fn delete_message(
        &self,
        room_id: &str,
        message_id: &str,
    ) -> Result<Routed<()>, StoreError> {
        self.route(
            "delete_message",
            |r| r.delete_message(room_id, message_id),
            |l| l.delete_message(room_id, message_id),
        )
    }

    pub fn clear_messages(&self, room_id: &str) -> Result<Routed<()>, StoreError> {
        self.route(
            "clear_messages",
            |r| r.clear_messages(room_id),
            |l| l.clear_messages(room_id),
        )
    }

    pub fn list_calculations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Routed<Vec<CalcEntry>>, StoreError> {
        self.route(
            "list_calculations",
            |r| r.list_calculations(user_id, limit),
            |l| l.list_calculations(user_id, limit),
        )
    }

    pub fn insert_calculation(
        &self,
        user_id: &str,
        entry: &CalcEntry,
    ) -> Result<Routed<()>, StoreError> {
        self.route(
            "insert_calculation",
            |r| r.insert_calculation(user_id, entry),
            |l| l.insert_calculation(user_id, entry),
        )
    }

    pub fn clear_calculations(&self, user_id: &str) -> Result<Routed<()>, StoreError> {
        self.route(
            "clear_calculations",
            |r| r.clear_calculations(user_id),
            |l| l.clear_calculations(user_id),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{memory_local_store, StubRemote};

    #[test]
    fn local_only_store_never_touches_remote() {
        let store: DualStore<StubRemote, _> = DualStore::local_only(memory_local_store());

        let rooms = store.list_rooms().expect("local list must succeed");

        assert_eq!(store.mode(), StoreMode::Local);
        assert_eq!(rooms.served_by, StoreMode::Local);
        assert!(store.remote().is_none());
    }

    #[test]
    fn remote_success_is_served_by_remote() {
        let remote = StubRemote::default();
        remote.seed_room("r1", "Lobby");
        let store = DualStore::with_remote(remote, memory_local_store());

        let rooms = store.list_rooms().expect("remote list must succeed");

        assert_eq!(rooms.served_by, StoreMode::Remote);
        assert_eq!(rooms.value[0].name, "Lobby");
    }

    #[test]
    fn remote_failure_falls_back_to_local_for_that_call_only() {
        let remote = StubRemote::default();
        remote.fail_next("list_messages");
        let store = DualStore::with_remote(remote, memory_local_store());

        let first = store.list_messages("general").expect("fallback must succeed");
        let second = store.list_messages("general").expect("remote must succeed");

        assert_eq!(first.served_by, StoreMode::Local);
        assert_eq!(second.served_by, StoreMode::Remote);
        assert_eq!(store.mode(), StoreMode::Remote);
    }

    #[test]
    fn into_local_only_drops_remote_for_the_session() {
        let remote = StubRemote::default();
        let calls = remote.calls();
        let store = DualStore::with_remote(remote, memory_local_store()).into_local_only();

        store.list_rooms().expect("local list must succeed");
        store
            .clear_messages("general")
            .expect("local clear must succeed");

        assert_eq!(store.mode(), StoreMode::Local);
        assert!(calls.lock().expect("calls lock").is_empty());
    }

    #[test]
    fn routed_map_keeps_serving_store() {
        let routed = Routed {
            value: 2,
            served_by: StoreMode::Remote,
        };

        assert_eq!(
            routed.map(|v| v * 2),
            Routed {
                value: 4,
                served_by: StoreMode::Remote
            }
        );
    }
}
