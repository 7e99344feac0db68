//! Per-document injector state machine
//!
//! Runs once per document: resolves the persona (document-local marker
//! override first, then the global active persona), re-registers the tab
//! with the coordinator, and writes the persona prompt into an empty input
//! on a fresh conversation at most once per document lifetime.

use tracing::debug;

use crate::store::StorageData;
use crate::types::{Persona, PersonaId, Settings};

use super::surface::DocumentSurface;

/// Lifecycle phase of the injector within one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectorPhase {
    /// Nothing resolved yet; waiting for initialization.
    Uninitialized,

    /// Persona and settings loaded; watching for an injection opportunity.
    Loaded,

    /// Prompt written; the watch is torn down.
    Injected,

    /// No injection will happen on this document; the watch is unarmed.
    Idle,
}

/// What a mutation notification resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The document location changed; the machine reset itself and must be
    /// re-initialized with fresh store data.
    NavigationChanged,

    /// The prompt was written; the caller should re-register the tab under
    /// this persona.
    Injected { persona_id: PersonaId },

    /// Nothing happened.
    None,
}

/// Per-document agent binding a tab to its persona.
pub struct PageInjector<D: DocumentSurface> {
    document: D,
    phase: InjectorPhase,
    settings: Settings,
    resolved: Option<Persona>,
    watch_armed: bool,
    /// Injection happens at most once per document lifetime, surviving
    /// same-document navigation resets.
    injected: bool,
    last_location: Option<String>,
}

impl<D: DocumentSurface> PageInjector<D> {
    pub fn new(document: D) -> Self {
        Self {
            document,
            phase: InjectorPhase::Uninitialized,
            settings: Settings::default(),
            resolved: None,
            watch_armed: false,
            injected: false,
            last_location: None,
        }
    }

    pub fn phase(&self) -> InjectorPhase {
        self.phase
    }

    /// Persona resolved for this document, if any.
    pub fn resolved_persona(&self) -> Option<&Persona> {
        self.resolved.as_ref()
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    /// Resolve persona and settings from a store snapshot.
    ///
    /// The document-local marker takes precedence over the global active
    /// persona; a dangling marker falls back to it. Returns the persona id
    /// the caller should re-register the tab under, if one resolved.
    pub fn initialize(&mut self, data: &StorageData) -> Option<PersonaId> {
        self.settings = data.settings;
        self.last_location = Some(self.document.location());

        self.resolved = self
            .document
            .session_marker()
            .and_then(|id| data.persona(&id))
            .or_else(|| data.active_persona())
            .cloned();
        self.phase = InjectorPhase::Loaded;

        let registration = self.resolved.as_ref().map(|p| p.id.clone());

        // The watch is only armed while an injection is still possible.
        self.watch_armed = self.settings.show_active_indicator
            && self.settings.auto_inject
            && self.resolved.is_some()
            && !self.injected;
        if !self.watch_armed {
            self.phase = if self.injected {
                InjectorPhase::Injected
            } else {
                InjectorPhase::Idle
            };
        }

        debug!(
            persona = self.resolved.as_ref().map(|p| p.name.as_str()),
            armed = self.watch_armed,
            "Injector initialized"
        );
        registration
    }

    /// React to a mutation notification from the document.
    ///
    /// Checks for a same-document navigation change first; otherwise
    /// attempts the single-shot injection when the document is a fresh
    /// conversation with an empty input.
    pub fn observe_mutation(&mut self) -> MutationOutcome {
        let location = self.document.location();
        if self.last_location.as_deref() != Some(location.as_str()) {
            self.last_location = Some(location);
            self.phase = InjectorPhase::Uninitialized;
            self.resolved = None;
            self.watch_armed = false;
            return MutationOutcome::NavigationChanged;
        }

        if !self.watch_armed || self.injected {
            return MutationOutcome::None;
        }
        if !self.document.is_fresh_conversation() {
            return MutationOutcome::None;
        }

        let prompt = match self.resolved.as_ref() {
            Some(p) if !p.prompt.is_empty() => p.prompt.clone(),
            // No prompt to inject; the watch stays armed and keeps
            // observing, same as an input that never empties.
            _ => return MutationOutcome::None,
        };
        match self.document.input_text() {
            Some(text) if text.trim().is_empty() => {}
            _ => return MutationOutcome::None,
        }

        if !self.document.write_input(&prompt) {
            return MutationOutcome::None;
        }

        let persona_id = self.resolved.as_ref().map(|p| p.id.clone()).unwrap_or_default();
        self.document.set_session_marker(&persona_id);
        self.injected = true;
        self.watch_armed = false;
        self.phase = InjectorPhase::Injected;

        debug!(persona_id = %persona_id, "Prompt injected");
        MutationOutcome::Injected { persona_id }
    }

    /// Apply a `SET_TAB_PERSONA` message: set the override marker and force
    /// re-initialization.
    pub fn apply_tab_persona(&mut self, persona_id: &str) {
        self.document.set_session_marker(persona_id);
        self.phase = InjectorPhase::Uninitialized;
        self.resolved = None;
        self.watch_armed = false;
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
