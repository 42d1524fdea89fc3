//! UI layer: line-based chat shell and text rendering.

pub mod event_source;
pub mod render;
pub mod shell;

/// Returns the UI module name for smoke checks.
pub fn module_name() -> &'static str {
    "ui"
}
