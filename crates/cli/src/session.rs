// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared data model: watched sessions and the idle events they emit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detector::DetectionMethod;

/// Status of a watched session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Idle,
    Stopped,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Idle => f.write_str("idle"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Emitted when a watched session goes idle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleEvent {
    pub session_id: String,
    pub tool_name: String,
    pub working_dir: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub last_output: String,
    #[serde(default)]
    pub idle_seconds: f64,
    pub detection_method: DetectionMethod,
}

/// One watched terminal session, from spawn to exit.
///
/// Created by the watcher before the child is spawned and mutated only by
/// the watcher. The 8-character id is the stable key joining the watcher,
/// hub, and subscriber views of the same run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    /// Stable short identifier (e.g. `claude_code`), distinct from the
    /// display name.
    pub tool_key: String,
    pub tool_name: String,
    pub command: Vec<String>,
    pub working_dir: String,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default)]
    pub last_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_idle_event: Option<IdleEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

impl Session {
    /// Create a new session with a fresh 8-character id.
    pub fn new(
        tool_key: impl Into<String>,
        tool_name: impl Into<String>,
        command: Vec<String>,
        working_dir: String,
    ) -> Self {
        Self {
            session_id: new_session_id(),
            tool_key: tool_key.into(),
            tool_name: tool_name.into(),
            command,
            working_dir,
            started_at: Utc::now(),
            status: SessionStatus::Active,
            last_output: String::new(),
            last_idle_event: None,
            pid: None,
        }
    }

    /// Short display name, e.g. `Claude Code-3fa9c1d2`.
    pub fn display_name(&self) -> String {
        let tool = if self.tool_name.is_empty() { "session" } else { &self.tool_name };
        format!("{tool}-{}", self.session_id)
    }
}

/// Generate an 8-character opaque session identifier.
fn new_session_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
