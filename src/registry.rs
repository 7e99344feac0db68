//! Tab registry — tracks which browser tab is bound to which persona.
//!
//! Owned exclusively by the background coordinator and rebuilt from scratch
//! on every daemon start; bindings reappear as page injectors re-register
//! their tabs. Not persisted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use crate::types::{PersonaId, TabId};

// ─────────────────────────────────────────────────────────────────
// Clock
// ─────────────────────────────────────────────────────────────────

/// Source of `lastActive` timestamps (milliseconds).
///
/// Injected so registry recency ordering is deterministic under test.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall-clock milliseconds since the Unix epoch.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Manually advanced clock for tests.
pub struct ManualClock {
    ms: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { ms: AtomicU64::new(start_ms) }
    }

    /// Advance the clock and return the new time.
    pub fn advance(&self, delta_ms: u64) -> u64 {
        self.ms.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tab Binding
// ─────────────────────────────────────────────────────────────────

/// The association of a browser tab with a persona, including recency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabBinding {
    /// Host-issued tab identifier.
    pub tab_id: TabId,

    /// Persona bound to this tab.
    pub persona_id: PersonaId,

    /// Last URL observed for the tab.
    pub url: String,

    /// Timestamp (ms) of the last registration, navigation, or focus.
    pub last_active: u64,
}

// ─────────────────────────────────────────────────────────────────
// Tab Registry
// ─────────────────────────────────────────────────────────────────

/// Thread-safe map from tab id to persona binding.
pub struct TabRegistry {
    tabs: RwLock<HashMap<TabId, TabBinding>>,
    clock: Arc<dyn Clock>,
}

impl TabRegistry {
    /// Create an empty registry using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty registry with an injected clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tabs: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register or re-register a tab for a persona (upsert).
    /// Refreshes `last_active` to now.
    pub fn register(&self, tab_id: TabId, persona_id: impl Into<PersonaId>, url: impl Into<String>) {
        let binding = TabBinding {
            tab_id,
            persona_id: persona_id.into(),
            url: url.into(),
            last_active: self.clock.now_ms(),
        };
        self.tabs.write().insert(tab_id, binding);
    }

    /// Refresh an already-known tab. Updates `last_active`, and the URL
    /// when one is given. Unknown tabs are ignored.
    pub fn touch(&self, tab_id: TabId, url: Option<&str>) -> bool {
        if let Some(binding) = self.tabs.write().get_mut(&tab_id) {
            if let Some(url) = url {
                binding.url = url.to_string();
            }
            binding.last_active = self.clock.now_ms();
            true
        } else {
            false
        }
    }

    /// Remove a tab's binding. Called on tab-close notifications and on
    /// failed existence probes.
    pub fn evict(&self, tab_id: TabId) -> Option<TabBinding> {
        self.tabs.write().remove(&tab_id)
    }

    /// Get a clone of a tab's binding.
    pub fn get(&self, tab_id: TabId) -> Option<TabBinding> {
        self.tabs.read().get(&tab_id).cloned()
    }

    /// All bindings for a persona, most recently active first.
    pub fn bindings_for(&self, persona_id: &str) -> Vec<TabBinding> {
        let mut bindings: Vec<TabBinding> = self
            .tabs
            .read()
            .values()
            .filter(|b| b.persona_id == persona_id)
            .cloned()
            .collect();
        bindings.sort_by(|a, b| b.last_active.cmp(&a.last_active));
        bindings
    }

    /// Number of tracked tabs.
    pub fn len(&self) -> usize {
        self.tabs.read().len()
    }

    /// Whether no tabs are tracked.
    pub fn is_empty(&self) -> bool {
        self.tabs.read().is_empty()
    }
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_registry(start_ms: u64) -> (TabRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        (TabRegistry::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_register_and_get() {
        let (registry, _clock) = manual_registry(100);
        registry.register(7, "a", "https://chat.example/new");

        assert_eq!(registry.len(), 1);
        let binding = registry.get(7).unwrap();
        assert_eq!(binding.persona_id, "a");
        assert_eq!(binding.last_active, 100);
    }

    #[test]
    fn test_register_is_upsert() {
        let (registry, clock) = manual_registry(100);
        registry.register(7, "a", "https://chat.example/new");
        clock.advance(50);
        registry.register(7, "b", "https://chat.example/chat/1");

        assert_eq!(registry.len(), 1);
        let binding = registry.get(7).unwrap();
        assert_eq!(binding.persona_id, "b");
        assert_eq!(binding.last_active, 150);
    }

    #[test]
    fn test_touch_known_tab() {
        let (registry, clock) = manual_registry(100);
        registry.register(7, "a", "https://chat.example/new");
        clock.advance(25);

        assert!(registry.touch(7, Some("https://chat.example/chat/9")));
        let binding = registry.get(7).unwrap();
        assert_eq!(binding.url, "https://chat.example/chat/9");
        assert_eq!(binding.last_active, 125);
    }

    #[test]
    fn test_touch_without_url_keeps_url() {
        let (registry, clock) = manual_registry(100);
        registry.register(7, "a", "https://chat.example/new");
        clock.advance(25);

        assert!(registry.touch(7, None));
        let binding = registry.get(7).unwrap();
        assert_eq!(binding.url, "https://chat.example/new");
        assert_eq!(binding.last_active, 125);
    }

    #[test]
    fn test_touch_unknown_tab_is_ignored() {
        let (registry, _clock) = manual_registry(100);
        assert!(!registry.touch(42, Some("https://chat.example/new")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_evict() {
        let (registry, _clock) = manual_registry(100);
        registry.register(7, "a", "https://chat.example/new");

        let evicted = registry.evict(7).unwrap();
        assert_eq!(evicted.tab_id, 7);
        assert!(registry.get(7).is_none());
        assert!(registry.evict(7).is_none());
    }

    #[test]
    fn test_bindings_for_orders_by_recency() {
        let (registry, clock) = manual_registry(100);
        registry.register(7, "b", "https://chat.example/chat/1");
        clock.advance(100);
        registry.register(9, "b", "https://chat.example/chat/2");
        registry.register(3, "a", "https://chat.example/chat/3");

        let bindings = registry.bindings_for("b");
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].tab_id, 9);
        assert_eq!(bindings[1].tab_id, 7);
        assert!(bindings[0].last_active > bindings[1].last_active);
    }

    #[test]
    fn test_bindings_for_unknown_persona_is_empty() {
        let (registry, _clock) = manual_registry(100);
        registry.register(7, "a", "https://chat.example/new");
        assert!(registry.bindings_for("zzz").is_empty());
    }
}
