//! User settings controlling coordinator and injector behavior.

use serde::{Deserialize, Serialize};

/// Behavior flags. Each is independent; there are no cross-field invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Open a fresh tab when starting a new conversation.
    pub open_in_new_tab: bool,

    /// Automatically write the persona prompt into empty conversations.
    pub auto_inject: bool,

    /// Render the in-page persona switcher/indicator.
    pub show_active_indicator: bool,

    /// Ask the user before starting a new conversation on switch.
    pub confirm_switch: bool,

    /// Tint the page with the persona color.
    pub personalized_background: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            open_in_new_tab: true,
            auto_inject: true,
            show_active_indicator: true,
            confirm_switch: true,
            personalized_background: true,
        }
    }
}
