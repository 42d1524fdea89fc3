//! Chat view model bound to the active store and, in remote mode, to one live
//! room subscription at a time.

use std::sync::{mpsc::Sender, Arc};

use crate::domain::{
    chat_view::ChatViewState,
    events::RoomEvent,
    identity::{now_ms, Identity},
    message::ChatMessage,
    room::ChatRoom,
};

use super::{
    clear_messages::clear_messages,
    contracts::{IdentityStore, RoomFeed, RoomSubscription, StoreError, SyncBackend},
    create_room::{create_room, CreateRoomError},
    delete_message::delete_message,
    dual_store::{DualStore, StoreMode},
    load_messages::load_messages,
    send_message::{send_message, SendMessageCommand, SendMessageError},
};

const FEED_SUBSCRIBE_FAILED: &str = "FEED_SUBSCRIBE_FAILED";
const ROOM_LOAD_FAILED: &str = "ROOM_LOAD_FAILED";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatSessionError {
    #[error("no chat rooms are available")]
    NoRooms,
    #[error("no room is open")]
    NoRoomOpen,
    #[error("name is empty")]
    EmptyName,
    #[error(transparent)]
    Send(#[from] SendMessageError),
    #[error(transparent)]
    CreateRoom(#[from] CreateRoomError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ChatSession<R, L> {
    store: Arc<DualStore<R, L>>,
    feed: Option<Arc<dyn RoomFeed>>,
    feed_tx: Sender<RoomEvent>,
    identity: Identity,
    view: ChatViewState,
    subscription: Option<Box<dyn RoomSubscription>>,
}

impl<R, L> ChatSession<R, L>
where
    R: SyncBackend,
    L: SyncBackend + IdentityStore,
{
    /// `feed_tx` is handed to every subscription; its receiver belongs to the
    /// event loop, which feeds events back through [`ChatSession::apply_feed_event`].
    pub fn new(
        store: Arc<DualStore<R, L>>,
        feed: Option<Arc<dyn RoomFeed>>,
        feed_tx: Sender<RoomEvent>,
        identity: Identity,
        rooms: Vec<ChatRoom>,
    ) -> Self {
        let mut view = ChatViewState::default();
        view.set_rooms(rooms);

        Self {
            store,
            feed,
            feed_tx,
            identity,
            view,
            subscription: None,
        }
    }

    pub fn view(&self) -> &ChatViewState {
        &self.view
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn mode(&self) -> StoreMode {
        self.store.mode()
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_some()
    }

    /// Switches to `room`: resolves the room (unknown ids fall back to the
    /// first room), replaces the subscription of any other room, subscribes in
    /// remote mode and loads the full history. Re-entering the live room keeps
    /// its subscription. Returns the resolved room id.
    pub fn enter_room(&mut self, room: &str) -> Result<String, ChatSessionError> {
        let Some(room_id) = self.view.resolve_room_id(room) else {
            self.subscription = None;
            return Err(ChatSessionError::NoRooms);
        };

        let already_live = self
            .subscription
            .as_ref()
            .is_some_and(|subscription| subscription.room_id() == room_id);
        if !already_live {
            self.subscription = None;
        }
        self.view.set_loading(room_id.clone());

        if !already_live && self.store.mode() == StoreMode::Remote {
            self.subscribe(&room_id);
        }

        match load_messages(&*self.store, &room_id) {
            Ok(routed) => {
                self.view.set_ready(routed.value);
                Ok(room_id)
            }
            Err(error) => {
                tracing::warn!(
                    code = ROOM_LOAD_FAILED,
                    room_id = %room_id,
                    error = %error,
                    "room history could not be loaded"
                );
                self.view.set_error();
                Err(error.into())
            }
        }
    }

    fn subscribe(&mut self, room_id: &str) {
        let Some(feed) = &self.feed else {
            return;
        };

        match feed.subscribe(room_id, self.feed_tx.clone()) {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(error) => tracing::warn!(
                code = FEED_SUBSCRIBE_FAILED,
                room_id,
                error = %error,
                "live updates unavailable for this room"
            ),
        }
    }

    /// Tears down the live subscription, if any.
    pub fn leave_room(&mut self) {
        self.subscription = None;
    }

    pub fn apply_feed_event(&mut self, event: RoomEvent) -> bool {
        self.view.apply_room_event(event)
    }

    pub fn send(&mut self, text: &str) -> Result<ChatMessage, ChatSessionError> {
        let room_id = self.open_room_id()?;
        let sent = send_message(
            &*self.store,
            &self.identity,
            SendMessageCommand {
                room_id: room_id.clone(),
                text: text.to_owned(),
            },
            now_ms(),
        )?;

        let message = sent.value;
        self.view.push_message(message.clone());
        self.view
            .record_last_message(&room_id, &message.message, message.timestamp);
        Ok(message)
    }

    pub fn create_room(&mut self, name: &str) -> Result<ChatRoom, ChatSessionError> {
        let created = create_room(&*self.store, name, now_ms())?;
        self.view.add_room(created.value.clone());
        Ok(created.value)
    }

    /// Returns `true` when the view changed right away. Remote-served deletes
    /// are left to the live feed.
    pub fn delete_message(&mut self, message_id: &str) -> Result<bool, ChatSessionError> {
        let room_id = self.open_room_id()?;
        let routed = delete_message(&*self.store, &room_id, message_id)?;

        Ok(match routed.served_by {
            StoreMode::Local => self.view.remove_message(message_id),
            StoreMode::Remote => false,
        })
    }

    pub fn clear_messages(&mut self) -> Result<bool, ChatSessionError> {
        let room_id = self.open_room_id()?;
        let routed = clear_messages(&*self.store, &room_id)?;

        Ok(match routed.served_by {
            StoreMode::Local => {
                self.view.clear_messages();
                true
            }
            StoreMode::Remote => false,
        })
    }

    /// Changes the display name used for new messages and persists it.
    pub fn rename(&mut self, name: &str) -> Result<&Identity, ChatSessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatSessionError::EmptyName);
        }

        let renamed = Identity {
            user_id: self.identity.user_id.clone(),
            user_name: name.to_owned(),
        };
        self.store.local().save_identity(&renamed)?;
        self.identity = renamed;
        Ok(&self.identity)
    }

    fn open_room_id(&self) -> Result<String, ChatSessionError> {
        self.view
            .room_id()
            .map(str::to_owned)
            .ok_or(ChatSessionError::NoRoomOpen)
    }
}
