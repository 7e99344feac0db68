//! Bridge-backed host environment
//!
//! Forwards `HostEnvironment` calls to the connected browser shim as
//! `HostCommand` frames and resolves replies through a pending-request
//! table keyed by correlation id. A single bridge connection is active at
//! a time; a new connection replaces the old one and in-flight requests
//! against the old connection fail with `BridgeClosed`.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::{HostCommand, HostReply, InjectorMessage, TabHandle};
use crate::types::TabId;

use super::HostEnvironment;

/// Host environment backed by the WebSocket bridge connection.
pub struct BridgeHost {
    /// Outbound command queue of the active connection, if any.
    outbound: RwLock<Option<mpsc::Sender<HostCommand>>>,

    /// In-flight correlated requests.
    pending: Mutex<HashMap<Uuid, oneshot::Sender<HostReply>>>,
}

impl BridgeHost {
    /// Create a bridge host with no connection attached.
    pub fn new() -> Self {
        Self {
            outbound: RwLock::new(None),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a connection's outbound queue, replacing any previous one.
    /// Requests still in flight against the old connection are failed.
    pub fn attach(&self, tx: mpsc::Sender<HostCommand>) {
        let previous = self.outbound.write().replace(tx);
        if previous.is_some() {
            debug!("Replacing existing bridge connection");
            self.fail_pending();
        }
    }

    /// Detach the active connection and fail in-flight requests.
    pub fn detach(&self) {
        *self.outbound.write() = None;
        self.fail_pending();
    }

    /// Detach only if the given queue is still the active connection, so a
    /// dying connection cannot tear down its replacement.
    pub fn detach_if(&self, tx: &mpsc::Sender<HostCommand>) {
        let mut guard = self.outbound.write();
        let is_active = guard.as_ref().map_or(false, |active| active.same_channel(tx));
        if is_active {
            *guard = None;
            drop(guard);
            self.fail_pending();
        }
    }

    /// Whether a bridge connection is currently attached.
    pub fn is_attached(&self) -> bool {
        self.outbound.read().is_some()
    }

    /// Resolve a pending request with the host's reply. Returns false for
    /// unknown correlation ids (stale replies are dropped).
    pub fn complete(&self, request_id: Uuid, reply: HostReply) -> bool {
        match self.pending.lock().remove(&request_id) {
            Some(tx) => tx.send(reply).is_ok(),
            None => {
                warn!(%request_id, "Dropping reply for unknown request");
                false
            }
        }
    }

    /// Drop all pending request senders; their receivers observe closure.
    fn fail_pending(&self) {
        self.pending.lock().clear();
    }

    /// Queue a fire-and-forget command.
    async fn dispatch(&self, command: HostCommand) -> Result<()> {
        let tx = self.outbound.read().clone().ok_or(Error::BridgeUnavailable)?;
        tx.send(command)
            .await
            .map_err(|_| Error::BridgeClosed("command queue closed".to_string()))
    }

    /// Queue a correlated command and await its reply.
    async fn request(&self, request_id: Uuid, command: HostCommand) -> Result<HostReply> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id, tx);

        if let Err(e) = self.dispatch(command).await {
            self.pending.lock().remove(&request_id);
            return Err(e);
        }

        rx.await
            .map_err(|_| Error::BridgeClosed("connection dropped while awaiting reply".to_string()))
    }
}

impl Default for BridgeHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostEnvironment for BridgeHost {
    async fn tab_exists(&self, tab_id: TabId) -> bool {
        let request_id = Uuid::new_v4();
        match self.request(request_id, HostCommand::ProbeTab { request_id, tab_id }).await {
            Ok(HostReply::TabExists { exists }) => exists,
            // A host that cannot answer reports the tab as gone; the
            // registry is repopulated by injectors re-registering.
            Ok(_) | Err(_) => false,
        }
    }

    async fn focus_tab(&self, tab_id: TabId) -> Result<()> {
        let request_id = Uuid::new_v4();
        match self.request(request_id, HostCommand::FocusTab { request_id, tab_id }).await? {
            HostReply::Done => Ok(()),
            HostReply::Failed { .. } => Err(Error::TabGone { tab_id }),
            other => Err(Error::ProtocolUnexpected(format!("{:?}", other))),
        }
    }

    async fn active_tab(&self) -> Option<TabHandle> {
        let request_id = Uuid::new_v4();
        match self.request(request_id, HostCommand::QueryActiveTab { request_id }).await {
            Ok(HostReply::ActiveTab { tab }) => tab,
            Ok(_) | Err(_) => None,
        }
    }

    async fn create_tab(&self, url: &str) -> Result<TabId> {
        let request_id = Uuid::new_v4();
        let command = HostCommand::CreateTab { request_id, url: url.to_string() };
        match self.request(request_id, command).await? {
            HostReply::TabCreated { tab_id } => Ok(tab_id),
            HostReply::Failed { message } => Err(Error::HostCommandFailed { message }),
            other => Err(Error::ProtocolUnexpected(format!("{:?}", other))),
        }
    }

    async fn navigate_tab(&self, tab_id: TabId, url: &str) -> Result<()> {
        let request_id = Uuid::new_v4();
        let command = HostCommand::NavigateTab {
            request_id,
            tab_id,
            url: url.to_string(),
        };
        match self.request(request_id, command).await? {
            HostReply::Done => Ok(()),
            HostReply::Failed { .. } => Err(Error::TabGone { tab_id }),
            other => Err(Error::ProtocolUnexpected(format!("{:?}", other))),
        }
    }

    async fn send_to_tab(&self, tab_id: TabId, message: InjectorMessage) -> Result<()> {
        self.dispatch(HostCommand::DeliverToTab { tab_id, message }).await
    }

    async fn open_options(&self) -> Result<()> {
        self.dispatch(HostCommand::OpenOptions).await
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Spawn a loopback "browser" that answers probe/create commands.
    fn spawn_loopback(host: Arc<BridgeHost>, existing_tab: TabId) -> mpsc::Sender<HostCommand> {
        let (tx, mut rx) = mpsc::channel::<HostCommand>(16);
        let host_clone = host.clone();
        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    HostCommand::ProbeTab { request_id, tab_id } => {
                        host_clone.complete(
                            request_id,
                            HostReply::TabExists { exists: tab_id == existing_tab },
                        );
                    }
                    HostCommand::CreateTab { request_id, .. } => {
                        host_clone.complete(request_id, HostReply::TabCreated { tab_id: 99 });
                    }
                    HostCommand::FocusTab { request_id, .. } => {
                        host_clone.complete(request_id, HostReply::Done);
                    }
                    _ => {}
                }
            }
        });
        tx
    }

    #[tokio::test]
    async fn test_unattached_bridge() {
        let host = BridgeHost::new();
        assert!(!host.is_attached());
        assert!(!host.tab_exists(7).await);
        assert!(matches!(
            host.create_tab("https://chat.example/new").await,
            Err(Error::BridgeUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_probe_round_trip() {
        let host = Arc::new(BridgeHost::new());
        let tx = spawn_loopback(host.clone(), 7);
        host.attach(tx);

        assert!(host.tab_exists(7).await);
        assert!(!host.tab_exists(8).await);
    }

    #[tokio::test]
    async fn test_create_and_focus() {
        let host = Arc::new(BridgeHost::new());
        let tx = spawn_loopback(host.clone(), 7);
        host.attach(tx);

        assert_eq!(host.create_tab("https://chat.example/new").await.unwrap(), 99);
        assert!(host.focus_tab(7).await.is_ok());
    }

    #[tokio::test]
    async fn test_detach_fails_requests() {
        let host = Arc::new(BridgeHost::new());
        // Attach a queue nobody drains, then detach mid-flight.
        let (tx, _rx) = mpsc::channel::<HostCommand>(16);
        host.attach(tx);

        let host_clone = host.clone();
        let probe = tokio::spawn(async move { host_clone.tab_exists(7).await });
        tokio::task::yield_now().await;
        host.detach();

        assert!(!probe.await.unwrap());
        assert!(!host.is_attached());
    }

    #[tokio::test]
    async fn test_stale_reply_is_dropped() {
        let host = BridgeHost::new();
        assert!(!host.complete(Uuid::new_v4(), HostReply::Done));
    }
}
