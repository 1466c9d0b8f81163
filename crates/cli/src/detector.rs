// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle detection engine.
//!
//! Combines two detection sources over one stream of output lines:
//! pattern matching against the registry (zero latency for tools with a
//! recognizable prompt) and a timeout-of-silence fallback (for tools
//! whose waiting state is visually indistinct from work in progress).
//! Both funnel through a cooldown gate so duplicate feeds and rapid
//! re-matches collapse into a single detection.

use std::sync::{Arc, LazyLock};
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::patterns::PatternRegistry;

/// Maximum number of redacted lines retained for event context.
const OUTPUT_RING_CAPACITY: usize = 50;

/// Lines of ring context attached to each detection.
const RECENT_LINES: usize = 10;

static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    // CSI sequences, OSC sequences terminated by BEL, and generic
    // ESC [ ... final-byte sequences.
    #[allow(clippy::expect_used)]
    let re = Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]|\x1b\].*?\x07|\x1b\[.*?[@-~]")
        .expect("ANSI pattern is a valid regex");
    re
});

/// Remove ANSI escape codes from terminal output.
pub fn strip_ansi(text: &str) -> String {
    ANSI_RE.replace_all(text, "").into_owned()
}

/// Which detection source fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    Pattern,
    Timeout,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Timeout => "timeout",
        }
    }
}

/// Outcome of a successful detection, handed to the watcher.
#[derive(Debug, Clone)]
pub struct IdleDetection {
    pub method: DetectionMethod,
    pub tool_key: String,
    /// Wall seconds since the last output line arrived.
    pub idle_seconds: f64,
    /// Most recent redacted output lines, oldest first.
    pub recent: Vec<String>,
}

/// Mutable detection state for a single session.
#[derive(Debug)]
struct DetectorState {
    last_output_time: f64,
    last_idle_notification: f64,
    ring: std::collections::VecDeque<String>,
    is_idle: bool,
    detected_tool: Option<String>,
}

/// Idle detection engine. Single owner; the watcher's select loop is the
/// only caller of `feed_line` and `check_timeout`.
pub struct Detector {
    registry: Arc<PatternRegistry>,
    tool_hint: Option<String>,
    redact: Vec<Regex>,
    state: DetectorState,
}

impl Detector {
    pub fn new(registry: Arc<PatternRegistry>, tool_hint: Option<String>) -> Self {
        Self {
            registry,
            tool_hint,
            redact: Vec::new(),
            state: DetectorState {
                last_output_time: now_secs(),
                last_idle_notification: 0.0,
                ring: std::collections::VecDeque::with_capacity(OUTPUT_RING_CAPACITY),
                is_idle: false,
                detected_tool: None,
            },
        }
    }

    /// Install redaction patterns. Invalid regexes are dropped.
    pub fn set_redact_patterns(&mut self, patterns: &[String]) {
        self.redact.clear();
        for pat in patterns {
            match Regex::new(pat) {
                Ok(re) => self.redact.push(re),
                Err(e) => {
                    tracing::warn!(pattern = %pat, err = %e, "dropping invalid redact pattern");
                }
            }
        }
    }

    /// Feed one line of terminal output.
    ///
    /// The line is ANSI-stripped and trimmed before anything else; empty
    /// lines are dropped. Matching runs on the cleaned but *unredacted*
    /// line so secrets inside a tool's prompt cannot mask detection; only
    /// the ring copy is redacted.
    pub fn feed_line(&mut self, raw: &str) -> Option<IdleDetection> {
        let now = now_secs();
        let stripped = strip_ansi(raw);
        let clean = stripped.trim();

        if clean.is_empty() {
            return None;
        }

        let redacted = self.redact_line(clean);
        if self.state.ring.len() == OUTPUT_RING_CAPACITY {
            self.state.ring.pop_front();
        }
        self.state.ring.push_back(redacted);
        self.state.last_output_time = now;
        self.state.is_idle = false;

        // Hinted tool first, then all tools in registry order.
        let matched = self
            .tool_hint
            .as_deref()
            .filter(|hint| {
                self.registry.tool(hint).is_some_and(|tool| tool.matches(clean))
            })
            .or_else(|| self.registry.match_any(clean))
            .map(str::to_owned);

        match matched {
            Some(tool_key) => self.trigger(DetectionMethod::Pattern, &tool_key, now),
            None => None,
        }
    }

    /// Fire the timeout path if the session has been silent long enough.
    ///
    /// Expected to be called roughly once per second by the watcher's
    /// ticker.
    pub fn check_timeout(&mut self) -> Option<IdleDetection> {
        let now = now_secs();
        let elapsed = now - self.state.last_output_time;

        if elapsed >= self.registry.timeout_seconds as f64 && !self.state.is_idle {
            let tool_key =
                self.tool_hint.clone().unwrap_or_else(|| "unknown".to_owned());
            return self.trigger(DetectionMethod::Timeout, &tool_key, now);
        }
        None
    }

    /// The cooldown gate. All detections pass through here.
    fn trigger(
        &mut self,
        method: DetectionMethod,
        tool_key: &str,
        now: f64,
    ) -> Option<IdleDetection> {
        let cooldown = self.registry.cooldown_seconds as f64;
        if now - self.state.last_idle_notification < cooldown {
            return None;
        }

        self.state.is_idle = true;
        self.state.last_idle_notification = now;
        self.state.detected_tool = Some(tool_key.to_owned());

        let idle_seconds = now - self.state.last_output_time;
        let recent = self.recent_output(RECENT_LINES);

        Some(IdleDetection { method, tool_key: tool_key.to_owned(), idle_seconds, recent })
    }

    /// Last `n` redacted output lines, oldest first.
    pub fn recent_output(&self, n: usize) -> Vec<String> {
        let skip = self.state.ring.len().saturating_sub(n);
        self.state.ring.iter().skip(skip).cloned().collect()
    }

    /// Whether an idle event has fired with no non-empty line since.
    pub fn is_idle(&self) -> bool {
        self.state.is_idle
    }

    fn redact_line(&self, line: &str) -> String {
        let mut out = line.to_owned();
        for re in &self.redact {
            out = re.replace_all(&out, "[REDACTED]").into_owned();
        }
        out
    }
}

/// Wall clock as fractional epoch seconds.
fn now_secs() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
