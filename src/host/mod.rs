//! Host environment abstraction
//!
//! The coordinator never talks to a browser directly; it drives tab
//! operations through the `HostEnvironment` trait. Production uses
//! [`BridgeHost`], which forwards commands over the WebSocket bridge to the
//! browser shim. Tests use [`MockHost`] for a deterministic in-memory host.

mod bridge;
mod mock;

pub use bridge::BridgeHost;
pub use mock::{HostOp, MockHost};

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{InjectorMessage, TabHandle};
use crate::types::TabId;

/// Tab operations the coordinator needs from the hosting browser.
///
/// Object-safe for dynamic dispatch. Every method is a single attempt; no
/// call is retried and failures degrade to a safe fallback in the caller.
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// Check whether a tab still exists. A host that cannot answer reports
    /// the tab as gone.
    async fn tab_exists(&self, tab_id: TabId) -> bool;

    /// Activate a tab and focus its parent window.
    async fn focus_tab(&self, tab_id: TabId) -> Result<()>;

    /// The active tab of the focused window, if any.
    async fn active_tab(&self) -> Option<TabHandle>;

    /// Open a new foreground tab at the given URL, returning its id.
    async fn create_tab(&self, url: &str) -> Result<TabId>;

    /// Navigate an existing tab to the given URL.
    async fn navigate_tab(&self, tab_id: TabId, url: &str) -> Result<()>;

    /// Deliver a message to a tab's page injector. Fire-and-forget.
    async fn send_to_tab(&self, tab_id: TabId, message: InjectorMessage) -> Result<()>;

    /// Open the standalone settings surface.
    async fn open_options(&self) -> Result<()>;
}
