use anyhow::Result;

use crate::domain::{
    chat_view::ChatUiState,
    events::{AppEvent, RoomChange, RoomEvent},
    shell_state::{ShellOutput, ShellState},
};

use super::{
    chat_session::ChatSession,
    contracts::{IdentityStore, ShellOrchestrator, SyncBackend},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Say(String),
    Rooms,
    Join(String),
    Create(String),
    Delete(String),
    Clear,
    Name(String),
    Help,
    Quit,
    MissingArgument(&'static str),
    Unknown(String),
    Nothing,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Nothing;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Say(line.to_owned());
        };

        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        let required = |usage: &'static str, build: fn(String) -> Self| {
            if argument.is_empty() {
                Self::MissingArgument(usage)
            } else {
                build(argument.to_owned())
            }
        };

        match name {
            "rooms" => Self::Rooms,
            "join" => required("/join ROOM", Self::Join),
            "create" => required("/create NAME", Self::Create),
            "delete" => required("/delete TAG", Self::Delete),
            "clear" => Self::Clear,
            "name" => required("/name NAME", Self::Name),
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

pub struct ChatShell<R, L> {
    state: ShellState,
    session: ChatSession<R, L>,
}

impl<R, L> ChatShell<R, L>
where
    R: SyncBackend,
    L: SyncBackend + IdentityStore,
{
    pub fn new(session: ChatSession<R, L>) -> Self {
        Self {
            state: ShellState::default(),
            session,
        }
    }

    pub fn session(&self) -> &ChatSession<R, L> {
        &self.session
    }

    /// Opens `room` and queues its history for display.
    pub fn open(&mut self, room: &str) {
        match self.session.enter_room(room) {
            Ok(_) => self.announce_room(),
            Err(error) => self.state.notice(format!("error: {error}")),
        }
    }

    fn announce_room(&mut self) {
        let view = self.session.view();
        let name = view
            .current_room()
            .map(|room| room.name.clone())
            .unwrap_or_default();
        let live = if self.session.is_live() { ", live" } else { "" };

        self.state.notice(format!(
            "joined #{name} ({} mode{live}) as {}",
            self.session.mode().as_label(),
            self.session.identity().user_name
        ));
        let history: Vec<_> = view.messages().to_vec();
        if history.is_empty() && view.ui_state() == ChatUiState::Ready {
            self.state.notice("no messages yet");
        }
        for message in history {
            self.state.emit(ShellOutput::Message(message));
        }
    }

    fn run_command(&mut self, command: ShellCommand) {
        match command {
            ShellCommand::Nothing => {}
            ShellCommand::Say(text) => match self.session.send(&text) {
                Ok(message) => self.state.emit(ShellOutput::Message(message)),
                Err(error) => self.state.notice(format!("error: {error}")),
            },
            ShellCommand::Rooms => {
                let view = self.session.view();
                self.state.emit(ShellOutput::Rooms {
                    rooms: view.rooms().to_vec(),
                    current: view.room_id().map(str::to_owned),
                });
            }
            ShellCommand::Join(room) => self.open(&room),
            ShellCommand::Create(name) => match self.session.create_room(&name) {
                Ok(room) => {
                    self.state
                        .notice(format!("created #{} ({})", room.name, room.id));
                    self.open(&room.id);
                }
                Err(error) => self.state.notice(format!("error: {error}")),
            },
            ShellCommand::Delete(tag) => {
                let message_id = self.session.view().resolve_message_id(&tag).unwrap_or(tag);
                match self.session.delete_message(&message_id) {
                    Ok(true) => self.state.emit(ShellOutput::MessageRemoved { message_id }),
                    Ok(false) => self.state.notice("delete requested"),
                    Err(error) => self.state.notice(format!("error: {error}")),
                }
            }
            ShellCommand::Clear => match self.session.clear_messages() {
                Ok(true) => self.state.notice("room cleared"),
                Ok(false) => self.state.notice("clear requested"),
                Err(error) => self.state.notice(format!("error: {error}")),
            },
            ShellCommand::Name(name) => match self.session.rename(&name) {
                Ok(identity) => {
                    let line = format!("you are now {}", identity.user_name);
                    self.state.notice(line);
                }
                Err(error) => self.state.notice(format!("error: {error}")),
            },
            ShellCommand::Help => self.state.emit(ShellOutput::Help),
            ShellCommand::Quit => self.quit(),
            ShellCommand::MissingArgument(usage) => {
                self.state.notice(format!("usage: {usage}"))
            }
            ShellCommand::Unknown(name) => self
                .state
                .notice(format!("unknown command /{name}; try /help")),
        }
    }

    fn apply_feed(&mut self, event: RoomEvent) {
        let output = match &event.change {
            RoomChange::Inserted(message) => ShellOutput::Message(message.clone()),
            RoomChange::Deleted { message_id } => ShellOutput::MessageRemoved {
                message_id: message_id.clone(),
            },
        };

        if self.session.apply_feed_event(event) {
            self.state.emit(output);
        }
    }

    fn quit(&mut self) {
        self.session.leave_room();
        self.state.stop();
    }
}

impl<R, L> ShellOrchestrator for ChatShell<R, L>
where
    R: SyncBackend,
    L: SyncBackend + IdentityStore,
{
    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Tick => {}
            AppEvent::QuitRequested => self.quit(),
            AppEvent::Input(line) => self.run_command(ShellCommand::parse(&line)),
            AppEvent::Feed(event) => self.apply_feed(event),
        }

        Ok(())
    }

    fn take_output(&mut self) -> Vec<ShellOutput> {
        self.state.take_output()
    }
}
