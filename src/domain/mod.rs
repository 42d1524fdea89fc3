//! Domain layer: core entities, view state and business rules.

pub mod calc;
pub mod chat_view;
pub mod events;
pub mod identity;
pub mod message;
pub mod room;
pub mod settings;
pub mod shell_state;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
