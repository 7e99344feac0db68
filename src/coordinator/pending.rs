//! Pending-navigation table
//!
//! Tracks tabs the coordinator has pointed at a new conversation and is
//! waiting on to finish loading. Replaces per-navigation one-shot listeners
//! with an explicit table: `resolve` removes the entry and hands back its
//! persona in one step, so the completion fires at most once, and entries
//! for tabs that close mid-navigation are dropped instead of leaking.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::types::{PersonaId, TabId};

/// Table of tabs awaiting navigation completion, keyed by tab id.
pub struct PendingNavigations {
    entries: Mutex<HashMap<TabId, PersonaId>>,
}

impl PendingNavigations {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a tab awaiting navigation completion. A tab can wait on at
    /// most one completion; a re-pointed tab keeps only the newest persona.
    pub fn insert(&self, tab_id: TabId, persona_id: impl Into<PersonaId>) {
        self.entries.lock().insert(tab_id, persona_id.into());
    }

    /// Fire the completion for a tab: removes the entry and returns its
    /// persona. A second resolve for the same tab returns `None`.
    pub fn resolve(&self, tab_id: TabId) -> Option<PersonaId> {
        self.entries.lock().remove(&tab_id)
    }

    /// Drop a tab's entry without firing (the tab closed mid-navigation).
    pub fn discard(&self, tab_id: TabId) -> bool {
        self.entries.lock().remove(&tab_id).is_some()
    }

    /// Number of tabs still awaited.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for PendingNavigations {
    fn default() -> Self {
        Self::new()
    }
}
