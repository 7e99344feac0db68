//! Background coordinator
//!
//! Owns the tab registry and runs the persona-switch decision procedure.
//! Collaborators (host environment, confirmation prompt, persona store) are
//! injected at construction.

mod confirm;
mod pending;
mod switchboard;

pub use confirm::{BridgePrompt, ConfirmOutcome, ConfirmationPrompt, ScriptedPrompt};
pub use pending::PendingNavigations;
pub use switchboard::{AppRouting, Coordinator, SwitchOutcome};
