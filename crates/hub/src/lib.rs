// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! jigai-hub: aggregates idle events from watchers and fans them out to
//! WebSocket subscribers.

pub mod config;
pub mod discovery;
pub mod state;
pub mod subscribers;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::HubConfig;
use crate::discovery::ServiceBroadcaster;
use crate::state::HubState;
use crate::transport::build_router;

/// Run the hub until shutdown (ctrl-c).
pub async fn run(config: HubConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let state = Arc::new(HubState::new(shutdown.clone()));

    let mut broadcaster = ServiceBroadcaster::new(config.port);
    if !config.no_mdns {
        broadcaster.start();
    }

    let router = build_router(Arc::clone(&state));
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("jigai-hub listening on {addr}");
    tracing::info!("  local:   http://localhost:{}", config.port);
    tracing::info!("  network: http://{}:{}", discovery::get_local_ip(), config.port);
    tracing::info!("  ws:      ws://{}:{}/ws", discovery::get_local_ip(), config.port);

    let sd = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        sd.cancel();
    });

    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    broadcaster.stop();
    Ok(())
}
