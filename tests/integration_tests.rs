//! Integration test harness
//!
//! End-to-end tests over the WebSocket bridge: a fake browser shim
//! connects to a running bridge server and exchanges the real wire frames,
//! plus store-backed injector flows.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

use persona_switchboard::coordinator::{AppRouting, BridgePrompt, Coordinator};
use persona_switchboard::host::{BridgeHost, HostEnvironment};
use persona_switchboard::injector::{MockDocument, MutationOutcome, PageInjector};
use persona_switchboard::protocol::{
    HostCommand, HostEvent, HostReply, Inbound, InjectorMessage, TabLoadStatus,
};
use persona_switchboard::registry::TabRegistry;
use persona_switchboard::server::{BridgeServer, BridgeServerConfig};
use persona_switchboard::store::PersonaStore;
use persona_switchboard::types::{Persona, Settings, DEFAULT_COLOR};

use common::TestEnvironment;

type Shim = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ─────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────

struct RunningSwitchboard {
    coordinator: Arc<Coordinator>,
    store: Arc<PersonaStore>,
    addr: std::net::SocketAddr,
    _env: TestEnvironment,
}

/// Start the full daemon wiring (store, bridge host, prompt, coordinator,
/// server) on an ephemeral port.
async fn start_switchboard(settings: Settings) -> RunningSwitchboard {
    let env = TestEnvironment::new();
    let store = Arc::new(PersonaStore::new(env.store_path.clone()));
    store
        .set_personas(vec![
            persona("a", "Coder"),
            persona("b", "Writer"),
        ])
        .await
        .unwrap();
    store.set_active_persona_id(Some("a")).await.unwrap();
    store.set_settings(settings).await.unwrap();

    let bridge = Arc::new(BridgeHost::new());
    let host: Arc<dyn HostEnvironment> = bridge.clone();
    let prompt = Arc::new(BridgePrompt::new(host.clone()));
    let coordinator = Arc::new(Coordinator::new(
        store.clone(),
        TabRegistry::new(),
        host,
        prompt,
        AppRouting::default(),
    ));

    let server = Arc::new(BridgeServer::new(
        BridgeServerConfig {
            listen_addr: "127.0.0.1:0".to_string(),
            queue_size: 16,
        },
        coordinator.clone(),
        bridge,
    ));
    let addr = server.start().await.unwrap();

    RunningSwitchboard {
        coordinator,
        store,
        addr,
        _env: env,
    }
}

fn persona(id: &str, name: &str) -> Persona {
    Persona {
        id: id.to_string(),
        name: name.to_string(),
        description: String::new(),
        prompt: format!("You are {}.", name),
        color: DEFAULT_COLOR.to_string(),
        created: chrono::Utc::now(),
    }
}

async fn connect_shim(addr: std::net::SocketAddr) -> Shim {
    let (ws, _) = connect_async(format!("ws://{}", addr))
        .await
        .expect("Failed to connect shim");
    ws
}

/// Send a UI message frame as the shim would.
async fn send_ui(shim: &mut Shim, json: serde_json::Value) {
    shim.send(WsMessage::Text(json.to_string())).await.unwrap();
}

/// Send a host event frame as the shim would.
async fn send_event(shim: &mut Shim, event: HostEvent) {
    let frame = serde_json::to_string(&Inbound::Host { event }).unwrap();
    shim.send(WsMessage::Text(frame)).await.unwrap();
}

/// Read the next host command the daemon sends.
async fn next_command(shim: &mut Shim) -> HostCommand {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), shim.next())
            .await
            .expect("Timed out waiting for host command")
            .expect("Bridge closed")
            .expect("Bridge read error");
        match msg {
            WsMessage::Text(text) => {
                return serde_json::from_str(&text).expect("Unparseable host command");
            }
            _ => continue,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Bridge end-to-end
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_switch_over_bridge_creates_and_binds_tab() {
    let sb = start_switchboard(Settings {
        confirm_switch: false,
        ..Settings::default()
    })
    .await;
    let mut shim = connect_shim(sb.addr).await;

    // UI asks to switch to persona "b".
    send_ui(
        &mut shim,
        serde_json::json!({
            "kind": "UI",
            "message": { "action": "SWITCH_PERSONA", "personaId": "b" }
        }),
    )
    .await;

    // The daemon asks the host to create the conversation tab.
    let (request_id, url) = match next_command(&mut shim).await {
        HostCommand::CreateTab { request_id, url } => (request_id, url),
        other => panic!("Expected CreateTab, got {:?}", other),
    };
    assert_eq!(url, "https://claude.ai/new");

    // The browser reports the created tab.
    send_event(
        &mut shim,
        HostEvent::CommandResult {
            request_id,
            result: HostReply::TabCreated { tab_id: 42 },
        },
    )
    .await;

    // The binding lands in the registry and the active persona flips.
    wait_until(|| sb.coordinator.registry().get(42).is_some()).await;
    assert_eq!(
        sb.coordinator.registry().get(42).unwrap().persona_id,
        "b"
    );
    assert_eq!(
        sb.store.active_persona_id().await.unwrap().as_deref(),
        Some("b")
    );

    // Navigation completes; the tab receives its persona.
    send_event(
        &mut shim,
        HostEvent::TabUpdated {
            tab_id: 42,
            url: "https://claude.ai/new".to_string(),
            status: TabLoadStatus::Complete,
        },
    )
    .await;
    match next_command(&mut shim).await {
        HostCommand::DeliverToTab { tab_id, message } => {
            assert_eq!(tab_id, 42);
            assert_eq!(
                message,
                InjectorMessage::SetTabPersona { persona_id: "b".to_string() }
            );
        }
        other => panic!("Expected DeliverToTab, got {:?}", other),
    }
}

#[tokio::test]
async fn test_switch_over_bridge_focuses_registered_tab() {
    let sb = start_switchboard(Settings {
        confirm_switch: false,
        ..Settings::default()
    })
    .await;
    let mut shim = connect_shim(sb.addr).await;

    // A page injector registers its tab for persona "b".
    send_ui(
        &mut shim,
        serde_json::json!({
            "kind": "UI",
            "senderTab": 7,
            "senderUrl": "https://claude.ai/chat/xyz",
            "message": { "action": "REGISTER_PERSONA_TAB", "personaId": "b" }
        }),
    )
    .await;
    wait_until(|| sb.coordinator.registry().get(7).is_some()).await;

    // Switching to "b" probes the tab and focuses it instead of creating
    // a new conversation.
    send_ui(
        &mut shim,
        serde_json::json!({
            "kind": "UI",
            "message": { "action": "SWITCH_PERSONA", "personaId": "b" }
        }),
    )
    .await;

    let request_id = match next_command(&mut shim).await {
        HostCommand::ProbeTab { request_id, tab_id } => {
            assert_eq!(tab_id, 7);
            request_id
        }
        other => panic!("Expected ProbeTab, got {:?}", other),
    };
    send_event(
        &mut shim,
        HostEvent::CommandResult {
            request_id,
            result: HostReply::TabExists { exists: true },
        },
    )
    .await;

    let request_id = match next_command(&mut shim).await {
        HostCommand::FocusTab { request_id, tab_id } => {
            assert_eq!(tab_id, 7);
            request_id
        }
        other => panic!("Expected FocusTab, got {:?}", other),
    };
    send_event(
        &mut shim,
        HostEvent::CommandResult {
            request_id,
            result: HostReply::Done,
        },
    )
    .await;

    wait_until_async(|| async {
        sb.store.active_persona_id().await.unwrap().as_deref() == Some("b")
    })
    .await;
}

#[tokio::test]
async fn test_tab_removed_over_bridge_evicts_binding() {
    let sb = start_switchboard(Settings::default()).await;
    let mut shim = connect_shim(sb.addr).await;

    send_ui(
        &mut shim,
        serde_json::json!({
            "kind": "UI",
            "senderTab": 7,
            "senderUrl": "https://claude.ai/chat/xyz",
            "message": { "action": "REGISTER_PERSONA_TAB", "personaId": "b" }
        }),
    )
    .await;
    wait_until(|| sb.coordinator.registry().get(7).is_some()).await;

    send_event(&mut shim, HostEvent::TabRemoved { tab_id: 7 }).await;
    wait_until(|| sb.coordinator.registry().get(7).is_none()).await;
}

#[tokio::test]
async fn test_malformed_frame_is_dropped_not_fatal() {
    let sb = start_switchboard(Settings::default()).await;
    let mut shim = connect_shim(sb.addr).await;

    shim.send(WsMessage::Text("this is not json".to_string()))
        .await
        .unwrap();

    // The connection survives; a valid frame still works.
    send_ui(
        &mut shim,
        serde_json::json!({
            "kind": "UI",
            "senderTab": 9,
            "message": { "action": "REGISTER_PERSONA_TAB", "personaId": "a" }
        }),
    )
    .await;
    wait_until(|| sb.coordinator.registry().get(9).is_some()).await;
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Condition not reached within 5s");
}

async fn wait_until_async<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..500 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Condition not reached within 5s");
}

// ─────────────────────────────────────────────────────────────────
// Injector against the real store
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_injector_flow_from_store_snapshot() {
    let env = TestEnvironment::new();
    let store = PersonaStore::new(env.store_path.clone());
    store
        .set_personas(vec![persona("a", "Coder")])
        .await
        .unwrap();
    store.set_active_persona_id(Some("a")).await.unwrap();

    let data = store.load().await.unwrap();
    let mut injector = PageInjector::new(MockDocument::fresh_conversation(
        "https://claude.ai/new",
    ));

    let registration = injector.initialize(&data);
    assert_eq!(registration.as_deref(), Some("a"));

    match injector.observe_mutation() {
        MutationOutcome::Injected { persona_id } => assert_eq!(persona_id, "a"),
        other => panic!("Expected injection, got {:?}", other),
    }
    assert_eq!(
        injector.document().input.as_deref(),
        Some("You are Coder.")
    );
}

#[tokio::test]
async fn test_injector_marker_precedence_from_store() {
    let env = TestEnvironment::new();
    let store = PersonaStore::new(env.store_path.clone());
    store
        .set_personas(vec![persona("a", "Coder"), persona("b", "Writer")])
        .await
        .unwrap();
    store.set_active_persona_id(Some("a")).await.unwrap();

    let data = store.load().await.unwrap();

    // A document carrying the override marker resolves to it.
    let marked = MockDocument::fresh_conversation("https://claude.ai/new").with_marker("b");
    let mut injector = PageInjector::new(marked);
    assert_eq!(injector.initialize(&data).as_deref(), Some("b"));

    // A document without the marker resolves to the global active persona.
    let unmarked = MockDocument::fresh_conversation("https://claude.ai/new");
    let mut injector = PageInjector::new(unmarked);
    assert_eq!(injector.initialize(&data).as_deref(), Some("a"));
}

// ─────────────────────────────────────────────────────────────────
// Store round-trips
// ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_settings_round_trip_field_for_field() {
    let env = TestEnvironment::new();
    let store = PersonaStore::new(env.store_path.clone());

    let written = Settings {
        open_in_new_tab: false,
        auto_inject: true,
        show_active_indicator: false,
        confirm_switch: true,
        personalized_background: false,
    };
    store.set_settings(written).await.unwrap();

    // A second store handle over the same file sees the identical record.
    let reread = PersonaStore::new(env.store_path.clone())
        .settings()
        .await
        .unwrap();
    assert_eq!(reread, written);
}

#[tokio::test]
async fn test_store_shared_between_handles() {
    let env = TestEnvironment::new();
    let writer = PersonaStore::new(env.store_path.clone());
    let reader = PersonaStore::new(env.store_path.clone());

    writer.set_personas(vec![persona("a", "Coder")]).await.unwrap();
    writer.set_active_persona_id(Some("a")).await.unwrap();

    let seen = reader.active_persona().await.unwrap().unwrap();
    assert_eq!(seen.name, "Coder");
}
