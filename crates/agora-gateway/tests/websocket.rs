//! Gateway integration tests: real listener, real WebSocket clients.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use agora_gateway::connection::handle_connection;
use agora_gateway::{Hub, HubConfig};

async fn upgrade(
    State(hub): State<Hub>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let identity = params.get("username").cloned().unwrap_or_default();
    ws.on_upgrade(move |socket| handle_connection(socket, hub, identity))
}

async fn serve(hub: Hub) -> SocketAddr {
    let app = Router::new().route("/ws", get(upgrade)).with_state(hub);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn wait_for_sessions(hub: &Hub, expected: usize) {
    for _ in 0..200 {
        if hub.snapshot().await.sessions == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("hub never reached {} sessions", expected);
}

async fn next_text<S>(stream: &mut S) -> String
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return text.as_str().to_string();
        }
    }
}

#[tokio::test]
async fn client_messages_are_relayed_to_everyone() {
    let hub = Hub::spawn(HubConfig::default());
    let addr = serve(hub.clone()).await;

    let (mut alice, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws?username=alice", addr))
        .await
        .unwrap();
    let (mut bob, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws?username=bob", addr))
        .await
        .unwrap();
    wait_for_sessions(&hub, 2).await;
    assert_eq!(
        hub.snapshot().await.identities,
        vec!["alice".to_string(), "bob".to_string()]
    );

    alice.send(Message::text("hello from alice")).await.unwrap();
    assert_eq!(next_text(&mut bob).await, "hello from alice");
    assert_eq!(next_text(&mut alice).await, "hello from alice");
}

#[tokio::test]
async fn server_broadcast_and_targeted_delivery() {
    let hub = Hub::spawn(HubConfig::default());
    let addr = serve(hub.clone()).await;

    let (mut alice, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws?username=alice", addr))
        .await
        .unwrap();
    let (mut bob, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws?username=bob", addr))
        .await
        .unwrap();
    wait_for_sessions(&hub, 2).await;

    hub.send_to("bob", r#"{"type":"dm"}"#).await;
    hub.broadcast(r#"{"type":"all"}"#).await;

    assert_eq!(next_text(&mut bob).await, r#"{"type":"dm"}"#);
    assert_eq!(next_text(&mut bob).await, r#"{"type":"all"}"#);
    // Alice only sees the broadcast
    assert_eq!(next_text(&mut alice).await, r#"{"type":"all"}"#);
}

#[tokio::test]
async fn closing_the_socket_unregisters() {
    let hub = Hub::spawn(HubConfig::default());
    let addr = serve(hub.clone()).await;

    let (mut alice, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws?username=alice", addr))
        .await
        .unwrap();
    let (_bob, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws?username=bob", addr))
        .await
        .unwrap();
    wait_for_sessions(&hub, 2).await;

    alice.close(None).await.unwrap();
    wait_for_sessions(&hub, 1).await;
    assert_eq!(hub.snapshot().await.identities, vec!["bob".to_string()]);
}
