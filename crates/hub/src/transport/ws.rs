// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket endpoint for hub subscribers.
//!
//! Subscribers receive every broadcast frame; inbound frames are accepted
//! and ignored (heartbeat replies, future commands) and must never tear
//! down the connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::time::Instant;

use crate::state::{now_iso, HubState, SessionRecord};

/// `GET /ws` — WebSocket upgrade for subscribers.
pub async fn ws_handler(
    State(state): State<Arc<HubState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// Per-connection loop.
async fn handle_socket(state: Arc<HubState>, socket: WebSocket) {
    let (id, mut frames) = state.subscribers.add().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Current state snapshot on connect.
    let sessions: Vec<SessionRecord> = state.sessions.read().await.values().cloned().collect();
    let hello = json!({
        "type": "connected",
        "sessions": sessions,
        "server_version": env!("CARGO_PKG_VERSION"),
    });
    if ws_tx.send(Message::Text(hello.to_string().into())).await.is_err() {
        state.subscribers.remove(id).await;
        return;
    }

    tracing::debug!(subscriber = id, "subscriber connected");

    // Heartbeat deadline. The timer is owned across iterations and reset
    // only by inbound traffic, so broadcast volume never postpones it.
    let heartbeat_after = state.heartbeat_after;
    let mut quiet = Box::pin(tokio::time::sleep(heartbeat_after));

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => break,

            // Broadcast frames -> subscriber.
            frame = frames.recv() => {
                match frame {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Nothing heard from the subscriber for a while: let it know
            // we are still here, then rearm.
            () = quiet.as_mut() => {
                let heartbeat = json!({ "type": "heartbeat", "server_time": now_iso() });
                if ws_tx.send(Message::Text(heartbeat.to_string().into())).await.is_err() {
                    break;
                }
                quiet.as_mut().reset(Instant::now() + heartbeat_after);
            }

            // Inbound traffic.
            inbound = ws_rx.next() => {
                quiet.as_mut().reset(Instant::now() + heartbeat_after);
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignored; future commands.
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.subscribers.remove(id).await;
    tracing::debug!(subscriber = id, "subscriber disconnected");
}
