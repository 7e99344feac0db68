//! Protocol message definitions
//!
//! Message types exchanged between UI surfaces, page injectors, the
//! background coordinator, and the browser host bridge. Serialized as JSON
//! with a discriminator field and camelCase payload fields.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{PersonaId, TabId};

// ─────────────────────────────────────────────────────────────────
// UI → Coordinator Messages
// ─────────────────────────────────────────────────────────────────

/// Messages sent by UI surfaces (popup, options) and page injectors
/// to the coordinator. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum UiMessage {
    /// Run the persona switch decision procedure.
    SwitchPersona { persona_id: PersonaId },

    /// Bind the sender's tab to a persona (sender tab id is implicit
    /// in the frame).
    RegisterPersonaTab { persona_id: PersonaId },

    /// Open the standalone settings surface.
    OpenOptions,

    /// Confirmed continuation of a switch: start a new conversation.
    CreateNewConversation { persona_id: PersonaId },
}

impl UiMessage {
    /// Get the message action name.
    pub fn action_name(&self) -> &'static str {
        match self {
            UiMessage::SwitchPersona { .. } => "SWITCH_PERSONA",
            UiMessage::RegisterPersonaTab { .. } => "REGISTER_PERSONA_TAB",
            UiMessage::OpenOptions => "OPEN_OPTIONS",
            UiMessage::CreateNewConversation { .. } => "CREATE_NEW_CONVERSATION",
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Coordinator → Injector Messages
// ─────────────────────────────────────────────────────────────────

/// Messages delivered by the coordinator to a specific tab's page injector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum InjectorMessage {
    /// Ask the user to confirm starting a new conversation. The reply, on
    /// acceptance only, is a `CREATE_NEW_CONVERSATION` UI message.
    ConfirmNewConversation {
        persona_name: String,
        persona_id: PersonaId,
    },

    /// Set the document-local persona override marker and re-initialize.
    SetTabPersona { persona_id: PersonaId },
}

// ─────────────────────────────────────────────────────────────────
// Host Bridge: Events
// ─────────────────────────────────────────────────────────────────

/// Navigation state of a tab as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabLoadStatus {
    Loading,
    Complete,
}

/// A tab as reported by the host environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabHandle {
    /// Host-issued tab id.
    pub id: TabId,

    /// Current URL, when the host is allowed to see it.
    #[serde(default)]
    pub url: Option<String>,
}

/// Tab lifecycle events and command replies from the browser bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum HostEvent {
    /// A tab's navigation state changed.
    TabUpdated {
        tab_id: TabId,
        url: String,
        status: TabLoadStatus,
    },

    /// A tab was closed.
    TabRemoved { tab_id: TabId },

    /// Reply to a correlated host command.
    CommandResult { request_id: Uuid, result: HostReply },
}

// ─────────────────────────────────────────────────────────────────
// Host Bridge: Commands
// ─────────────────────────────────────────────────────────────────

/// Commands the coordinator issues to the browser bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum HostCommand {
    /// Check whether a tab still exists.
    ProbeTab { request_id: Uuid, tab_id: TabId },

    /// Activate a tab and focus its parent window.
    FocusTab { request_id: Uuid, tab_id: TabId },

    /// Query the active tab of the focused window.
    QueryActiveTab { request_id: Uuid },

    /// Open a new foreground tab at the given URL.
    CreateTab { request_id: Uuid, url: String },

    /// Navigate an existing tab to the given URL.
    NavigateTab {
        request_id: Uuid,
        tab_id: TabId,
        url: String,
    },

    /// Open the standalone settings surface. Fire-and-forget.
    OpenOptions,

    /// Deliver an injector message to a tab. Fire-and-forget.
    DeliverToTab {
        tab_id: TabId,
        message: InjectorMessage,
    },
}

/// Structured replies correlated with host commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum HostReply {
    /// Reply to `PROBE_TAB`.
    TabExists { exists: bool },

    /// Reply to `QUERY_ACTIVE_TAB`.
    ActiveTab { tab: Option<TabHandle> },

    /// Reply to `CREATE_TAB`.
    TabCreated { tab_id: TabId },

    /// Command completed with no payload.
    Done,

    /// Command failed on the host side.
    Failed { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Bridge Framing
// ─────────────────────────────────────────────────────────────────

/// Frames arriving on the bridge socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum Inbound {
    /// A UI/injector message, with the sender's tab identity when the
    /// message originated in a page context.
    Ui {
        #[serde(default)]
        sender_tab: Option<TabId>,
        #[serde(default)]
        sender_url: Option<String>,
        message: UiMessage,
    },

    /// A host lifecycle event or command reply.
    Host { event: HostEvent },
}

impl Inbound {
    /// Deserialize from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl HostCommand {
    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
