// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watcher-side stub for the event hub.
//!
//! The hub is optional: every call swallows transport errors and reports
//! plain success/failure, so a watch behaves identically with or without
//! a hub running.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;

use crate::session::{IdleEvent, Session};
use crate::watcher::IdleSink;

/// Hub address used when none is configured.
pub const DEFAULT_HUB_URL: &str = "http://localhost:9384";

/// Health probe deadline.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Deadline for session/event posts.
const PUSH_TIMEOUT: Duration = Duration::from_secs(3);

/// Thin HTTP client for pushing sessions and idle events to the hub.
pub struct HubClient {
    base_url: String,
    client: Client,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        let client = Client::builder().build().unwrap_or_default();
        Self { base_url, client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check whether the hub is reachable.
    pub async fn is_running(&self) -> bool {
        let resp = self
            .client
            .get(self.url("/api/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }

    /// Register a session with the hub.
    pub async fn register_session(&self, session: &Session) -> bool {
        let body = serde_json::json!({
            "session_id": &session.session_id,
            "tool_name": &session.tool_name,
            "command": &session.command,
            "working_dir": &session.working_dir,
        });
        self.post_json("/api/sessions", &body).await
    }

    /// Remove a session from the hub.
    pub async fn unregister_session(&self, session_id: &str) -> bool {
        let resp = self
            .client
            .delete(self.url(&format!("/api/sessions/{session_id}")))
            .timeout(PUSH_TIMEOUT)
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }

    /// Push an idle event to the hub.
    pub async fn push_event(&self, event: &IdleEvent) -> bool {
        match serde_json::to_value(event) {
            Ok(body) => self.post_json("/api/events", &body).await,
            Err(_) => false,
        }
    }

    /// Fetch the hub's session list. Unlike the push paths this surfaces
    /// the error, so `jigai sessions` can report an unreachable hub.
    pub async fn list_sessions(&self) -> anyhow::Result<serde_json::Value> {
        let resp = self
            .client
            .get(self.url("/api/sessions"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> bool {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .timeout(PUSH_TIMEOUT)
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }
}

impl IdleSink for HubClient {
    fn emit<'a>(&'a self, event: &'a IdleEvent) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if !self.push_event(event).await {
                tracing::debug!("hub event push failed, continuing");
            }
        })
    }
}

#[cfg(test)]
#[path = "hub_client_tests.rs"]
mod tests;
