//! Use case layer: storage routing, sync workflows and shell orchestration.

pub mod bootstrap;
pub mod calc_history;
pub mod chat_session;
pub mod chat_shell;
pub mod clear_messages;
pub mod context;
pub mod contracts;
pub mod create_room;
pub mod delete_message;
pub mod dual_store;
pub mod initialize;
pub mod load_messages;
pub mod send_message;
pub mod settings;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
