//! User-confirmation capability
//!
//! The switch procedure asks the user before starting a new conversation
//! when `confirmSwitch` is enabled. The ambient dialog lives browser-side;
//! the coordinator only sees this trait, so the decision procedure is
//! testable without a real UI.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::host::HostEnvironment;
use crate::protocol::InjectorMessage;
use crate::types::{Persona, PersonaId, TabId};

/// Outcome of a confirmation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The user accepted; proceed with the new conversation.
    Accepted,

    /// The user declined; abort the switch.
    Declined,

    /// The request never reached a page that could show it; proceed.
    Undeliverable,
}

/// Asks the user to confirm starting a new conversation for a persona.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    /// Present the question through the given foreground tab and wait for
    /// the user's decision.
    async fn confirm(&self, tab_id: TabId, persona: &Persona) -> ConfirmOutcome;

    /// Feed an accepted reply back into a waiting prompt. Returns true if a
    /// prompt consumed it; false means nobody was waiting and the caller
    /// should treat the reply as a standalone request.
    fn accept(&self, persona_id: &str) -> bool {
        let _ = persona_id;
        false
    }
}

// ─────────────────────────────────────────────────────────────────
// Bridge-backed prompt
// ─────────────────────────────────────────────────────────────────

/// Production prompt: delivers `CONFIRM_NEW_CONVERSATION` to the foreground
/// tab and resolves when the matching `CREATE_NEW_CONVERSATION` reply comes
/// back through the bridge. The page only replies on acceptance, so a
/// dismissed dialog leaves the switch suspended until the waiter is
/// superseded or the daemon shuts down.
pub struct BridgePrompt {
    host: Arc<dyn HostEnvironment>,
    waiting: Mutex<HashMap<PersonaId, oneshot::Sender<()>>>,
}

impl BridgePrompt {
    pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
        Self {
            host,
            waiting: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ConfirmationPrompt for BridgePrompt {
    async fn confirm(&self, tab_id: TabId, persona: &Persona) -> ConfirmOutcome {
        let (tx, rx) = oneshot::channel();
        // A newer prompt for the same persona supersedes the old waiter;
        // the superseded switch observes Declined.
        self.waiting.lock().insert(persona.id.clone(), tx);

        let message = InjectorMessage::ConfirmNewConversation {
            persona_name: persona.name.clone(),
            persona_id: persona.id.clone(),
        };
        if self.host.send_to_tab(tab_id, message).await.is_err() {
            self.waiting.lock().remove(&persona.id);
            return ConfirmOutcome::Undeliverable;
        }

        match rx.await {
            Ok(()) => ConfirmOutcome::Accepted,
            Err(_) => ConfirmOutcome::Declined,
        }
    }

    fn accept(&self, persona_id: &str) -> bool {
        match self.waiting.lock().remove(persona_id) {
            Some(tx) => tx.send(()).is_ok(),
            None => {
                debug!(persona_id, "Acceptance with no waiting prompt");
                false
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Scripted prompt for tests
// ─────────────────────────────────────────────────────────────────

/// Test prompt returning a fixed outcome and recording what it was asked.
pub struct ScriptedPrompt {
    outcome: ConfirmOutcome,
    asked: Mutex<Vec<(TabId, PersonaId)>>,
}

impl ScriptedPrompt {
    pub fn new(outcome: ConfirmOutcome) -> Self {
        Self {
            outcome,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// The (tab, persona) pairs this prompt was asked about, in order.
    pub fn asked(&self) -> Vec<(TabId, PersonaId)> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl ConfirmationPrompt for ScriptedPrompt {
    async fn confirm(&self, tab_id: TabId, persona: &Persona) -> ConfirmOutcome {
        self.asked.lock().push((tab_id, persona.id.clone()));
        self.outcome
    }
}
