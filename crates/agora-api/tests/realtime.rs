//! `/ws` handshake against a real listener.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use agora_api::auth::create_token;
use agora_api::{AppState, AppStateInner, router};
use agora_gateway::{Hub, HubConfig};
use agora_store::Store;

const SECRET: &str = "test-secret";

async fn serve() -> (AppState, SocketAddr) {
    let state = AppStateInner::new(Store::new(), Hub::spawn(HubConfig::default()), SECRET);
    let app = router(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, addr)
}

fn ws_url(addr: SocketAddr, username: &str) -> String {
    let token = create_token(SECRET, username).unwrap();
    format!("ws://{}/ws?token={}", addr, token)
}

async fn wait_for_sessions(state: &AppState, expected: usize) {
    for _ in 0..200 {
        if state.hub.snapshot().await.sessions == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("hub never reached {} sessions", expected);
}

async fn wait_for_connected(state: &AppState, username: &str, expected: bool) {
    for _ in 0..200 {
        if state.store.user(username).unwrap().connected == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never reached connected={}", username, expected);
}

#[tokio::test]
async fn test_second_socket_keeps_user_connected() {
    let (state, addr) = serve().await;
    state.store.register_user("alice").unwrap();

    let (mut first, _) = tokio_tungstenite::connect_async(ws_url(addr, "alice")).await.unwrap();
    let (_second, _) = tokio_tungstenite::connect_async(ws_url(addr, "alice")).await.unwrap();
    wait_for_sessions(&state, 2).await;
    assert!(state.store.user("alice").unwrap().connected);

    first.close(None).await.unwrap();
    wait_for_sessions(&state, 1).await;
    // Let the closed socket's handler finish its bookkeeping
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(state.hub.snapshot().await.identities, vec!["alice".to_string()]);
    assert!(state.store.user("alice").unwrap().connected);
}

#[tokio::test]
async fn test_last_socket_closing_disconnects() {
    let (state, addr) = serve().await;
    state.store.register_user("bob").unwrap();

    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url(addr, "bob")).await.unwrap();
    wait_for_connected(&state, "bob", true).await;

    socket.close(None).await.unwrap();
    wait_for_connected(&state, "bob", false).await;
    wait_for_sessions(&state, 0).await;
}

#[tokio::test]
async fn test_handshake_requires_valid_token() {
    let (state, addr) = serve().await;

    assert!(tokio_tungstenite::connect_async(format!("ws://{}/ws", addr)).await.is_err());
    assert!(
        tokio_tungstenite::connect_async(format!("ws://{}/ws?token=garbage", addr))
            .await
            .is_err()
    );

    let forged = create_token("other-secret", "bob").unwrap();
    assert!(
        tokio_tungstenite::connect_async(format!("ws://{}/ws?token={}", addr, forged))
            .await
            .is_err()
    );
    assert_eq!(state.hub.snapshot().await.sessions, 0);
}

#[tokio::test]
async fn test_direct_message_reaches_token_owner() {
    let (state, addr) = serve().await;
    state.store.register_user("alice").unwrap();
    state.store.register_user("bob").unwrap();

    let (mut bob, _) = tokio_tungstenite::connect_async(ws_url(addr, "bob")).await.unwrap();
    wait_for_sessions(&state, 1).await;

    let message = state.store.send_direct_message("alice", "bob", "hi bob").unwrap();
    agora_api::publish(
        &state.hub,
        agora_types::events::Notification::DirectMessage { message },
    )
    .await;

    let frame = tokio::time::timeout(Duration::from_secs(5), bob.next())
        .await
        .expect("timed out waiting for a frame")
        .expect("stream ended")
        .expect("websocket error");
    let Message::Text(text) = frame else {
        panic!("expected a text frame, got {:?}", frame);
    };
    let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(value["type"], "DirectMessage");
    assert_eq!(value["data"]["message"]["to_user"], "bob");
}
