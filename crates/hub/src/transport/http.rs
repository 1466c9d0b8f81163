// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the hub API.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::state::{now_iso, HubState, SessionRecord, MAX_HISTORY};

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub clients: usize,
    pub sessions: usize,
}

/// Incoming idle event from a watcher.
#[derive(Debug, Deserialize)]
pub struct IdleEventRequest {
    pub session_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub working_dir: String,
    #[serde(default)]
    pub last_output: String,
    #[serde(default)]
    pub idle_seconds: f64,
    #[serde(default = "default_detection_method")]
    pub detection_method: String,
}

fn default_detection_method() -> String {
    "pattern".to_owned()
}

/// Register a new watched session.
#[derive(Debug, Deserialize)]
pub struct SessionRegisterRequest {
    pub session_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub working_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/health`
pub async fn health(State(s): State<Arc<HubState>>) -> impl IntoResponse {
    let clients = s.subscribers.count().await;
    let sessions = s.sessions.read().await.len();
    Json(HealthResponse {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        clients,
        sessions,
    })
}

/// `GET /api/sessions` — all session records.
pub async fn list_sessions(State(s): State<Arc<HubState>>) -> impl IntoResponse {
    let sessions = s.sessions.read().await;
    let list: Vec<SessionRecord> = sessions.values().cloned().collect();
    Json(json!({ "sessions": list }))
}

/// `GET /api/events?limit=N` — most recent idle events, oldest first.
pub async fn list_events(
    State(s): State<Arc<HubState>>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(20);
    let events = s.events.read().await;
    let skip = events.len().saturating_sub(limit);
    let recent: Vec<serde_json::Value> = events.iter().skip(skip).cloned().collect();
    Json(json!({ "events": recent }))
}

/// `POST /api/events` — ingest an idle event and fan it out.
pub async fn receive_event(
    State(s): State<Arc<HubState>>,
    Json(req): Json<IdleEventRequest>,
) -> impl IntoResponse {
    let event = json!({
        "type": "idle_detected",
        "session_id": &req.session_id,
        "tool_name": &req.tool_name,
        "working_dir": &req.working_dir,
        "last_output": &req.last_output,
        "idle_seconds": req.idle_seconds,
        "detection_method": &req.detection_method,
        "timestamp": now_iso(),
    });

    // The record is replaced wholesale: an idle event is the freshest
    // truth about the session.
    {
        let mut sessions = s.sessions.write().await;
        sessions.insert(
            req.session_id.clone(),
            SessionRecord {
                session_id: req.session_id.clone(),
                tool_name: req.tool_name.clone(),
                working_dir: req.working_dir.clone(),
                command: None,
                status: "idle".to_owned(),
                registered_at: None,
                last_event: Some(event.clone()),
            },
        );
    }

    {
        let mut events = s.events.write().await;
        events.push_back(event.clone());
        if events.len() > MAX_HISTORY {
            events.pop_front();
        }
    }

    let notified = s.subscribers.broadcast(event).await;
    tracing::debug!(session_id = %req.session_id, clients = notified, "idle event broadcast");

    Json(json!({ "status": "ok", "clients_notified": notified }))
}

/// `POST /api/sessions` — register a watched session.
pub async fn register_session(
    State(s): State<Arc<HubState>>,
    Json(req): Json<SessionRegisterRequest>,
) -> impl IntoResponse {
    {
        let mut sessions = s.sessions.write().await;
        sessions.insert(
            req.session_id.clone(),
            SessionRecord {
                session_id: req.session_id.clone(),
                tool_name: req.tool_name.clone(),
                working_dir: req.working_dir.clone(),
                command: Some(req.command.clone()),
                status: "active".to_owned(),
                registered_at: Some(now_iso()),
                last_event: None,
            },
        );
    }

    tracing::info!(session_id = %req.session_id, tool = %req.tool_name, "session registered");

    s.subscribers
        .broadcast(json!({
            "type": "session_started",
            "session_id": &req.session_id,
            "tool_name": &req.tool_name,
            "working_dir": &req.working_dir,
        }))
        .await;

    Json(json!({ "status": "ok" }))
}

/// `DELETE /api/sessions/{id}` — remove a watched session.
pub async fn unregister_session(
    State(s): State<Arc<HubState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    s.sessions.write().await.remove(&id);
    tracing::info!(session_id = %id, "session unregistered");

    s.subscribers
        .broadcast(json!({
            "type": "session_stopped",
            "session_id": &id,
        }))
        .await;

    Json(json!({ "status": "ok" }))
}
