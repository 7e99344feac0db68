//! WebSocket bridge server
//!
//! Accepts the browser shim's connection and relays frames between it and
//! the coordinator: UI/injector messages and host events come in, host
//! commands go out through the attached [`BridgeHost`]. One shim connection
//! is active at a time; a newer connection replaces the old one.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::coordinator::Coordinator;
use crate::error::{Error, Result};
use crate::host::BridgeHost;
use crate::protocol::{HostCommand, HostEvent, Inbound};

// ─────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────

/// Bridge server configuration.
#[derive(Debug, Clone)]
pub struct BridgeServerConfig {
    /// Address the WebSocket listener binds to.
    pub listen_addr: String,

    /// Outbound host-command queue size per connection.
    pub queue_size: usize,
}

impl Default for BridgeServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8787".to_string(),
            queue_size: 64,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Bridge Server
// ─────────────────────────────────────────────────────────────────

/// Listens for browser shim connections and pumps frames.
pub struct BridgeServer {
    config: BridgeServerConfig,
    coordinator: Arc<Coordinator>,
    bridge: Arc<BridgeHost>,
}

impl BridgeServer {
    pub fn new(
        config: BridgeServerConfig,
        coordinator: Arc<Coordinator>,
        bridge: Arc<BridgeHost>,
    ) -> Self {
        Self {
            config,
            coordinator,
            bridge,
        }
    }

    /// Bind the listener and spawn the accept loop. Returns the bound
    /// address (useful with port 0).
    pub async fn start(self: &Arc<Self>) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .map_err(|e| {
                Error::Connection(format!(
                    "Failed to bind bridge listener on {}: {}",
                    self.config.listen_addr, e
                ))
            })?;
        let addr = listener
            .local_addr()
            .map_err(|e| Error::Connection(e.to_string()))?;

        info!(addr = %addr, "Bridge listening");

        let server = Arc::clone(self);
        tokio::spawn(async move {
            server.accept_loop(listener).await;
        });

        Ok(addr)
    }

    /// Accept incoming shim connections.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    debug!(peer_addr = %peer_addr, "Incoming bridge connection");
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream).await {
                            debug!(error = %e, "Bridge connection ended");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Accept failed");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Drive one shim connection until it closes.
    async fn handle_connection(self: Arc<Self>, stream: TcpStream) -> Result<()> {
        let ws_stream = accept_async(stream).await?;
        let (mut write, mut read) = ws_stream.split();

        // Attach the outbound command queue; a previous shim connection is
        // replaced and its in-flight requests fail over to this one's.
        let (tx, mut rx) = mpsc::channel::<HostCommand>(self.config.queue_size);
        self.bridge.attach(tx.clone());
        info!("Browser shim connected");

        // Writer: drain host commands onto the socket.
        let writer = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                let json = match command.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize host command");
                        continue;
                    }
                };
                if let Err(e) = write.send(WsMessage::Text(json)).await {
                    debug!(error = %e, "Bridge write failed");
                    break;
                }
            }
            // Flush a close frame on the way out; the shim reconnects.
            let _ = write.send(WsMessage::Close(None)).await;
        });

        // Reader: dispatch inbound frames.
        while let Some(msg) = read.next().await {
            match msg {
                Ok(WsMessage::Text(text)) => self.dispatch_frame(&text).await,
                Ok(WsMessage::Ping(_)) => {
                    // The protocol layer queues the pong; it flushes with
                    // the next outbound command.
                }
                Ok(WsMessage::Close(frame)) => {
                    debug!(frame = ?frame, "Received close frame");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Bridge read error");
                    break;
                }
                _ => {}
            }
        }

        self.bridge.detach_if(&tx);
        drop(tx);
        let _ = writer.await;
        info!("Browser shim disconnected");
        Ok(())
    }

    /// Parse and route one inbound frame.
    async fn dispatch_frame(&self, text: &str) {
        let frame = match Inbound::from_json(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Dropping malformed bridge frame");
                return;
            }
        };

        match frame {
            Inbound::Ui {
                sender_tab,
                sender_url,
                message,
            } => {
                // Switches can suspend on user confirmation, which arrives
                // as a later frame; handle on a separate task so the read
                // loop keeps draining.
                let coordinator = Arc::clone(&self.coordinator);
                tokio::spawn(async move {
                    if let Err(e) = coordinator
                        .handle_ui_message(sender_tab, sender_url, message)
                        .await
                    {
                        warn!(error = %e.format_for_log(), "UI message failed");
                    }
                });
            }
            Inbound::Host { event } => match event {
                HostEvent::TabUpdated { tab_id, url, status } => {
                    let coordinator = Arc::clone(&self.coordinator);
                    tokio::spawn(async move {
                        coordinator.on_tab_updated(tab_id, &url, status).await;
                    });
                }
                HostEvent::TabRemoved { tab_id } => {
                    self.coordinator.on_tab_removed(tab_id);
                }
                HostEvent::CommandResult { request_id, result } => {
                    self.bridge.complete(request_id, result);
                }
            },
        }
    }
}
