//! In-memory host environment for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::protocol::{InjectorMessage, TabHandle};
use crate::types::TabId;

use super::HostEnvironment;

/// A host operation observed by the mock, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    Probe(TabId),
    Focus(TabId),
    QueryActiveTab,
    Create(String),
    Navigate(TabId, String),
    Deliver(TabId, InjectorMessage),
    OpenOptions,
}

/// Deterministic host: a set of live tabs, an optional foreground tab, and
/// a log of every operation the coordinator issued.
pub struct MockHost {
    tabs: Mutex<HashSet<TabId>>,
    active: Mutex<Option<TabHandle>>,
    next_tab_id: AtomicI64,
    ops: Mutex<Vec<HostOp>>,
    /// Tabs that disappear the moment a focus is attempted, emulating a
    /// close racing the switch procedure.
    vanish_on_focus: Mutex<HashSet<TabId>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            tabs: Mutex::new(HashSet::new()),
            active: Mutex::new(None),
            next_tab_id: AtomicI64::new(100),
            ops: Mutex::new(Vec::new()),
            vanish_on_focus: Mutex::new(HashSet::new()),
        }
    }

    /// Host with the given live tabs.
    pub fn with_tabs(tab_ids: &[TabId]) -> Self {
        let host = Self::new();
        host.tabs.lock().extend(tab_ids.iter().copied());
        host
    }

    pub fn add_tab(&self, tab_id: TabId) {
        self.tabs.lock().insert(tab_id);
    }

    pub fn remove_tab(&self, tab_id: TabId) {
        self.tabs.lock().remove(&tab_id);
    }

    /// Set the foreground tab reported by `active_tab`.
    pub fn set_active(&self, tab: Option<TabHandle>) {
        *self.active.lock() = tab;
    }

    /// Make a tab vanish when the coordinator tries to focus it.
    pub fn vanish_on_focus(&self, tab_id: TabId) {
        self.vanish_on_focus.lock().insert(tab_id);
    }

    /// Operations issued so far, in order.
    pub fn ops(&self) -> Vec<HostOp> {
        self.ops.lock().clone()
    }

    /// Messages delivered to a specific tab.
    pub fn deliveries(&self, tab_id: TabId) -> Vec<InjectorMessage> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                HostOp::Deliver(id, msg) if *id == tab_id => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `Create` operations issued.
    pub fn created_count(&self) -> usize {
        self.ops
            .lock()
            .iter()
            .filter(|op| matches!(op, HostOp::Create(_)))
            .count()
    }

    fn record(&self, op: HostOp) {
        self.ops.lock().push(op);
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostEnvironment for MockHost {
    async fn tab_exists(&self, tab_id: TabId) -> bool {
        self.record(HostOp::Probe(tab_id));
        self.tabs.lock().contains(&tab_id)
    }

    async fn focus_tab(&self, tab_id: TabId) -> Result<()> {
        self.record(HostOp::Focus(tab_id));
        if self.vanish_on_focus.lock().remove(&tab_id) {
            self.tabs.lock().remove(&tab_id);
            return Err(Error::TabGone { tab_id });
        }
        if self.tabs.lock().contains(&tab_id) {
            Ok(())
        } else {
            Err(Error::TabGone { tab_id })
        }
    }

    async fn active_tab(&self) -> Option<TabHandle> {
        self.record(HostOp::QueryActiveTab);
        self.active.lock().clone()
    }

    async fn create_tab(&self, url: &str) -> Result<TabId> {
        self.record(HostOp::Create(url.to_string()));
        let tab_id = self.next_tab_id.fetch_add(1, Ordering::SeqCst);
        self.tabs.lock().insert(tab_id);
        Ok(tab_id)
    }

    async fn navigate_tab(&self, tab_id: TabId, url: &str) -> Result<()> {
        self.record(HostOp::Navigate(tab_id, url.to_string()));
        if self.tabs.lock().contains(&tab_id) {
            Ok(())
        } else {
            Err(Error::TabGone { tab_id })
        }
    }

    async fn send_to_tab(&self, tab_id: TabId, message: InjectorMessage) -> Result<()> {
        self.record(HostOp::Deliver(tab_id, message));
        Ok(())
    }

    async fn open_options(&self) -> Result<()> {
        self.record(HostOp::OpenOptions);
        Ok(())
    }
}
