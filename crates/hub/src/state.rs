// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::subscribers::SubscriberSet;

/// Upper bound on retained event history; oldest entries drop first.
pub const MAX_HISTORY: usize = 100;

/// Default inbound-silence window before a subscriber gets a heartbeat.
pub const DEFAULT_HEARTBEAT_AFTER: std::time::Duration = std::time::Duration::from_secs(30);

/// One watched session as the hub sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub working_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event: Option<serde_json::Value>,
}

/// Shared hub state.
pub struct HubState {
    pub sessions: RwLock<HashMap<String, SessionRecord>>,
    /// Idle events in arrival order, bounded at [`MAX_HISTORY`].
    pub events: RwLock<VecDeque<serde_json::Value>>,
    pub subscribers: SubscriberSet,
    pub shutdown: CancellationToken,
    /// Inbound-silence window before the WebSocket loop emits a
    /// heartbeat. Measured against subscriber traffic only; broadcasts
    /// do not reset it.
    pub heartbeat_after: std::time::Duration,
}

impl HubState {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            events: RwLock::new(VecDeque::new()),
            subscribers: SubscriberSet::new(),
            shutdown,
            heartbeat_after: DEFAULT_HEARTBEAT_AFTER,
        }
    }
}

/// Current UTC time as an ISO-8601 string.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}
