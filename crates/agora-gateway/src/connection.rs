use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::hub::{Hub, Registration};

/// Heartbeat interval: the writer sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the session ends.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Run one upgraded WebSocket as a hub session registered under `identity`.
///
/// Returns once the client goes away, the heartbeat expires, or the hub
/// drops the session for falling behind. The session is always unregistered
/// before returning.
pub async fn handle_connection(socket: WebSocket, hub: Hub, identity: String) {
    let Registration {
        session_id,
        outbound,
    } = match hub.register(identity.clone()).await {
        Ok(registration) => registration,
        Err(e) => {
            warn!("{} could not join the gateway: {}", identity, e);
            return;
        }
    };

    info!("{} connected to gateway (session {})", identity, session_id);

    let (sender, receiver) = socket.split();

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));

    let mut send_task = tokio::spawn(write_loop(sender, outbound, pong_received.clone()));
    let mut recv_task = tokio::spawn(read_loop(receiver, hub.clone(), identity.clone(), pong_received));

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(session_id).await;
    info!("{} disconnected from gateway (session {})", identity, session_id);
}

/// Drain the session's outbound queue into the socket, with heartbeat.
async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Bytes>,
    pong_received: Arc<AtomicBool>,
) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;
    let mut missed_heartbeats: u8 = 0;

    loop {
        tokio::select! {
            payload = outbound.recv() => {
                let Some(payload) = payload else {
                    // Hub closed our queue
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                };
                if sender.send(frame(payload)).await.is_err() {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if pong_received.swap(false, Ordering::Acquire) {
                    missed_heartbeats = 0;
                } else {
                    missed_heartbeats += 1;
                    if missed_heartbeats >= 2 {
                        warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                        break;
                    }
                }
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Forward everything the client sends back into the hub as a broadcast.
async fn read_loop(
    mut receiver: SplitStream<WebSocket>,
    hub: Hub,
    identity: String,
    pong_received: Arc<AtomicBool>,
) {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => {
                debug!("{} relayed {} bytes of text", identity, text.as_str().len());
                hub.broadcast(Bytes::copy_from_slice(text.as_str().as_bytes())).await;
            }
            Message::Binary(data) => {
                debug!("{} relayed {} bytes of binary", identity, data.len());
                hub.broadcast(data).await;
            }
            Message::Pong(_) => {
                pong_received.store(true, Ordering::Release);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

/// Payloads are opaque; valid UTF-8 goes out as a text frame so browser
/// clients get strings, anything else as binary.
fn frame(payload: Bytes) -> Message {
    match std::str::from_utf8(&payload) {
        Ok(text) => Message::Text(text.to_owned().into()),
        Err(_) => Message::Binary(payload),
    }
}
