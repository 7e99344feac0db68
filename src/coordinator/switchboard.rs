//! Persona switch resolution
//!
//! The coordinator owns the tab registry and decides, for each switch
//! request, whether to focus a tab already bound to the persona or to start
//! a new conversation. At most one binding per persona is treated as
//! canonical: reactivating a persona reuses its most recently active live
//! tab rather than spawning a duplicate conversation.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;
use crate::host::HostEnvironment;
use crate::protocol::{InjectorMessage, TabLoadStatus, UiMessage};
use crate::registry::{TabBinding, TabRegistry};
use crate::store::PersonaStore;
use crate::types::{Settings, TabId};

use super::confirm::{ConfirmOutcome, ConfirmationPrompt};
use super::pending::PendingNavigations;

// ─────────────────────────────────────────────────────────────────
// Application routing
// ─────────────────────────────────────────────────────────────────

/// Where new conversations live: the chat application's domain and its
/// fresh-conversation URL.
#[derive(Debug, Clone)]
pub struct AppRouting {
    /// Domain the chat application is served from (subdomains included).
    pub domain: String,

    /// URL that opens an empty conversation.
    pub new_conversation_url: String,
}

impl Default for AppRouting {
    fn default() -> Self {
        Self {
            domain: "claude.ai".to_string(),
            new_conversation_url: "https://claude.ai/new".to_string(),
        }
    }
}

impl AppRouting {
    /// Whether a URL belongs to the application domain.
    pub fn url_in_domain(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => parsed.host_str().map_or(false, |host| {
                host == self.domain || host.ends_with(&format!(".{}", self.domain))
            }),
            Err(_) => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Switch outcome
// ─────────────────────────────────────────────────────────────────

/// What a switch request resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// An existing tab bound to the persona was brought to focus.
    Focused { tab_id: TabId },

    /// A fresh tab was opened for a new conversation.
    Created { tab_id: TabId },

    /// The current foreground tab was pointed at a new conversation.
    ReusedCurrent { tab_id: TabId },

    /// The user declined to start a new conversation.
    Declined,
}

// ─────────────────────────────────────────────────────────────────
// Coordinator
// ─────────────────────────────────────────────────────────────────

/// Process-wide singleton reacting to tab lifecycle events and
/// cross-context messages.
///
/// Exclusively owns the [`TabRegistry`]; every collaborator is injected so
/// the decision procedure runs against mocks in tests.
pub struct Coordinator {
    store: Arc<PersonaStore>,
    registry: TabRegistry,
    host: Arc<dyn HostEnvironment>,
    prompt: Arc<dyn ConfirmationPrompt>,
    pending: PendingNavigations,
    app: AppRouting,
}

impl Coordinator {
    pub fn new(
        store: Arc<PersonaStore>,
        registry: TabRegistry,
        host: Arc<dyn HostEnvironment>,
        prompt: Arc<dyn ConfirmationPrompt>,
        app: AppRouting,
    ) -> Self {
        Self {
            store,
            registry,
            host,
            prompt,
            pending: PendingNavigations::new(),
            app,
        }
    }

    /// The tab registry (read access for inspection; mutation stays here).
    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    /// Tabs currently awaited for navigation completion.
    pub fn pending_navigations(&self) -> &PendingNavigations {
        &self.pending
    }

    // ─────────────────────────────────────────────────────────────
    // Message dispatch
    // ─────────────────────────────────────────────────────────────

    /// Handle a message from a UI surface or page injector.
    pub async fn handle_ui_message(
        &self,
        sender_tab: Option<TabId>,
        sender_url: Option<String>,
        message: UiMessage,
    ) -> Result<()> {
        debug!(action = message.action_name(), ?sender_tab, "UI message");

        match message {
            UiMessage::SwitchPersona { persona_id } => {
                let outcome = self.switch_to_persona(&persona_id).await?;
                debug!(?outcome, "Switch resolved");
            }
            UiMessage::RegisterPersonaTab { persona_id } => match sender_tab {
                Some(tab_id) => {
                    self.registry
                        .register(tab_id, persona_id, sender_url.unwrap_or_default());
                }
                None => warn!("Tab registration without a sender tab, ignoring"),
            },
            UiMessage::OpenOptions => {
                self.host.open_options().await?;
            }
            UiMessage::CreateNewConversation { persona_id } => {
                if self.prompt.accept(&persona_id) {
                    // A suspended switch consumed the acceptance and resumes
                    // on its own task.
                    debug!(persona_id = %persona_id, "Confirmation accepted");
                } else {
                    let outcome = self.create_new_conversation(&persona_id).await?;
                    debug!(?outcome, "New conversation started");
                }
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Tab lifecycle
    // ─────────────────────────────────────────────────────────────

    /// A tab's navigation state changed.
    pub async fn on_tab_updated(&self, tab_id: TabId, url: &str, status: TabLoadStatus) {
        if status != TabLoadStatus::Complete {
            return;
        }

        if self.app.url_in_domain(url) {
            self.registry.touch(tab_id, Some(url));
        }

        if let Some(persona_id) = self.pending.resolve(tab_id) {
            debug!(tab_id, persona_id = %persona_id, "Navigation complete, binding tab");
            let message = InjectorMessage::SetTabPersona { persona_id };
            if let Err(e) = self.host.send_to_tab(tab_id, message).await {
                warn!(tab_id, error = %e, "Failed to deliver tab persona");
            }
        }
    }

    /// A tab was closed.
    pub fn on_tab_removed(&self, tab_id: TabId) {
        if self.registry.evict(tab_id).is_some() {
            debug!(tab_id, "Evicted binding for closed tab");
        }
        if self.pending.discard(tab_id) {
            debug!(tab_id, "Dropped pending navigation for closed tab");
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Switch decision procedure
    // ─────────────────────────────────────────────────────────────

    /// Resolve a tab to present the persona in.
    ///
    /// Focuses the persona's most recently active live tab when one exists;
    /// otherwise starts a new conversation, asking the user first when
    /// `confirmSwitch` is enabled and the question can be delivered.
    pub async fn switch_to_persona(&self, persona_id: &str) -> Result<SwitchOutcome> {
        info!(persona_id, "Switching persona");

        // Committed before any confirmation; a later decline does not
        // revert it.
        self.store.set_active_persona_id(Some(persona_id)).await?;

        if let Some(binding) = self.most_recent_live_binding(persona_id).await {
            match self.host.focus_tab(binding.tab_id).await {
                Ok(()) => {
                    self.registry.touch(binding.tab_id, None);
                    debug!(tab_id = binding.tab_id, "Focused existing persona tab");
                    return Ok(SwitchOutcome::Focused {
                        tab_id: binding.tab_id,
                    });
                }
                Err(_) => {
                    // Closed between the probe and the focus attempt.
                    self.registry.evict(binding.tab_id);
                }
            }
        }

        let data = self.store.load().await?;
        if data.settings.confirm_switch {
            // Confirmation needs the persona's display name; an unknown id
            // skips straight to creation.
            if let Some(persona) = data.persona(persona_id) {
                if let Some(tab) = self.host.active_tab().await {
                    match self.prompt.confirm(tab.id, persona).await {
                        ConfirmOutcome::Declined => {
                            info!(persona_id, "New conversation declined");
                            return Ok(SwitchOutcome::Declined);
                        }
                        ConfirmOutcome::Accepted | ConfirmOutcome::Undeliverable => {}
                    }
                }
            }
        }

        self.start_conversation(persona_id, data.settings).await
    }

    /// Confirmed continuation of a switch: start the new conversation
    /// without asking again.
    pub async fn create_new_conversation(&self, persona_id: &str) -> Result<SwitchOutcome> {
        let settings = self.store.settings().await?;
        self.start_conversation(persona_id, settings).await
    }

    /// The persona's most recently active binding whose tab still exists.
    /// Every dead binding found along the way is evicted.
    async fn most_recent_live_binding(&self, persona_id: &str) -> Option<TabBinding> {
        let mut best: Option<TabBinding> = None;
        for binding in self.registry.bindings_for(persona_id) {
            if self.host.tab_exists(binding.tab_id).await {
                // Bindings come ordered by recency, so the first live one
                // wins.
                if best.is_none() {
                    best = Some(binding);
                }
            } else {
                self.registry.evict(binding.tab_id);
            }
        }
        best
    }

    /// Create-or-reuse a tab for a new conversation and register its
    /// binding before navigation completes.
    async fn start_conversation(
        &self,
        persona_id: &str,
        settings: Settings,
    ) -> Result<SwitchOutcome> {
        let url = self.app.new_conversation_url.clone();

        if !settings.open_in_new_tab {
            if let Some(tab) = self.host.active_tab().await {
                let on_app = tab
                    .url
                    .as_deref()
                    .map_or(false, |u| self.app.url_in_domain(u));
                if on_app {
                    self.registry.register(tab.id, persona_id, url.as_str());
                    self.pending.insert(tab.id, persona_id);
                    match self.host.navigate_tab(tab.id, &url).await {
                        Ok(()) => {
                            return Ok(SwitchOutcome::ReusedCurrent { tab_id: tab.id });
                        }
                        Err(e) => {
                            // The foreground tab vanished mid-switch; fall
                            // back to a fresh tab.
                            warn!(tab_id = tab.id, error = %e, "Reuse failed");
                            self.registry.evict(tab.id);
                            self.pending.discard(tab.id);
                        }
                    }
                }
            }
        }

        let tab_id = self.host.create_tab(&url).await?;
        self.registry.register(tab_id, persona_id, url.as_str());
        self.pending.insert(tab_id, persona_id);
        debug!(tab_id, persona_id, "Opened new conversation tab");
        Ok(SwitchOutcome::Created { tab_id })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
