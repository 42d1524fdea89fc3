use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "superapp",
    about = "Mini superapp client: chat rooms, settings and calculator history"
)]
pub struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start the interactive chat shell
    Chat {
        /// Room to open first (defaults to the first room)
        #[arg(long)]
        room: Option<String>,
    },
    /// List chat rooms
    Rooms,
    /// Print the messages of a room with their ids
    History {
        #[arg(long)]
        room: String,
    },
    /// Send one message to a room
    Send {
        #[arg(long)]
        room: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Create a chat room
    CreateRoom { name: String },
    /// Delete one message from a room
    DeleteMessage {
        #[arg(long)]
        room: String,
        message_id: String,
    },
    /// Delete every message of a room
    Clear {
        #[arg(long)]
        room: String,
    },
    /// Print the device identity
    Whoami,
    /// Change the display name
    Rename { name: String },
    /// Show or change user settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Calculator history
    CalcHistory {
        #[command(subcommand)]
        action: CalcHistoryAction,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum SettingsAction {
    Show,
    /// Change one setting, e.g. `set theme dark`
    Set { key: String, value: String },
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CalcHistoryAction {
    List,
    Add {
        #[arg(required = true, num_args = 1..)]
        calculation: Vec<String>,
    },
    Clear,
}

impl Cli {
    pub fn command_or_default(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Chat { room: None })
    }
}
