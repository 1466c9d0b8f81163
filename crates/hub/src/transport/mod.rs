// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the hub.

pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::routing::{delete, get};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::HubState;

/// Build the axum `Router` with all hub routes.
///
/// CORS is fully permissive: subscribers are unauthenticated LAN clients
/// by design.
pub fn build_router(state: Arc<HubState>) -> Router {
    Router::new()
        .route("/api/health", get(http::health))
        .route("/api/sessions", get(http::list_sessions).post(http::register_session))
        .route("/api/sessions/{id}", delete(http::unregister_session))
        .route("/api/events", get(http::list_events).post(http::receive_event))
        .route("/ws", get(ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
