// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watcher: owns one session and wires the PTY proxy to the detector.
//!
//! The proxy task hands output chunks over a bounded channel; the
//! watcher's select loop splits them into lines for the detector and
//! drives the once-per-second timeout check. Both detector call sites
//! therefore live on a single task and detections come back as plain
//! return values.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::JigaiConfig;
use crate::detector::{Detector, IdleDetection};
use crate::hub_client::HubClient;
use crate::notify::DesktopNotifier;
use crate::patterns::{self, PatternRegistry};
use crate::pty::{proxy, ChildPty, PtyProxy};
use crate::session::{IdleEvent, Session, SessionStatus};

/// Consumer of idle events.
///
/// Implemented by the desktop notifier and the hub client; emission is
/// best-effort on both.
pub trait IdleSink: Send + Sync {
    fn emit<'a>(&'a self, event: &'a IdleEvent) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Accumulates raw output chunks and yields complete lines.
///
/// The trailing partial line is additionally offered (without being
/// consumed) so prompts that never print a newline are still seen; the
/// detector's cooldown absorbs the resulting duplicate feeds.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk (decoded lossily) and drain any complete lines.
    pub fn feed(&mut self, data: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(data));

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=pos).collect();
            line.pop();
            lines.push(line);
        }
        lines
    }

    /// The unconsumed trailing fragment, if it has visible content.
    pub fn fragment(&self) -> Option<&str> {
        if self.buffer.trim().is_empty() {
            None
        } else {
            Some(self.buffer.as_str())
        }
    }
}

/// Watches a single command behind the PTY proxy and emits idle events.
pub struct Watcher {
    config: JigaiConfig,
    registry: Arc<PatternRegistry>,
    pub session: Session,
    detector: Detector,
    assembler: LineAssembler,
    sinks: Vec<Arc<dyn IdleSink>>,
    hub: Option<Arc<HubClient>>,
}

impl Watcher {
    pub fn new(
        command: Vec<String>,
        tool_override: Option<String>,
        config: JigaiConfig,
        registry: Arc<PatternRegistry>,
        hub: Option<Arc<HubClient>>,
    ) -> Self {
        let tool_key = tool_override
            .unwrap_or_else(|| patterns::detect_tool_from_command(&command, &registry));
        let tool_name = registry.display_name(&tool_key);

        let working_dir = std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let session = Session::new(tool_key.clone(), tool_name, command, working_dir);

        let mut detector = Detector::new(Arc::clone(&registry), Some(tool_key));
        detector.set_redact_patterns(&config.notifications.redact_patterns);

        let mut sinks: Vec<Arc<dyn IdleSink>> = Vec::new();
        if config.notifications.desktop {
            sinks.push(Arc::new(DesktopNotifier::new(config.notifications.clone())));
        }
        if let Some(ref hub) = hub {
            let cloned: Arc<HubClient> = Arc::clone(hub);
            let sink: Arc<dyn IdleSink> = cloned;
            sinks.push(sink);
        }

        Self {
            config,
            registry,
            session,
            detector,
            assembler: LineAssembler::new(),
            sinks,
            hub,
        }
    }

    /// Run the watched command to completion. Returns its exit code
    /// (130 when interrupted).
    pub async fn run(&mut self) -> anyhow::Result<i32> {
        // Stderr only: stdout belongs to the child, byte for byte.
        eprintln!(
            "[jigai] watching `{}` as {}",
            self.session.command.join(" "),
            self.session.display_name()
        );
        eprintln!(
            "[jigai]   dir: {} | timeout: {}s | cooldown: {}s",
            self.session.working_dir,
            self.registry.timeout_seconds,
            self.registry.cooldown_seconds
        );

        let (cols, rows) = proxy::terminal_size().unwrap_or((80, 24));
        let pty = ChildPty::spawn(&self.session.command, cols, rows)?;
        self.session.pid = Some(pty.child_pid());

        if let Some(ref hub) = self.hub {
            hub.register_session(&self.session).await;
        }

        let shutdown = CancellationToken::new();
        let (output_tx, mut output_rx) = mpsc::channel::<Bytes>(256);
        let proxy_shutdown = shutdown.clone();
        let proxy_handle =
            tokio::spawn(async move { PtyProxy::new(pty).run(output_tx, proxy_shutdown).await });

        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.tick().await; // Consume the immediate first tick.

        loop {
            tokio::select! {
                chunk = output_rx.recv() => {
                    match chunk {
                        Some(bytes) => self.handle_output(&bytes).await,
                        None => break, // Proxy finished.
                    }
                }

                _ = tick.tick() => {
                    if let Some(detection) = self.detector.check_timeout() {
                        self.handle_idle(detection).await;
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    shutdown.cancel();
                }
            }
        }

        let exit_code = proxy_handle.await??;

        self.session.status = SessionStatus::Stopped;
        if let Some(ref hub) = self.hub {
            hub.unregister_session(&self.session.session_id).await;
        }

        Ok(exit_code)
    }

    /// Split a raw chunk into detector feeds. Chunks carry no line
    /// alignment; the assembler owns the framing.
    async fn handle_output(&mut self, data: &[u8]) {
        let mut detections: Vec<IdleDetection> = Vec::new();

        for line in self.assembler.feed(data) {
            if let Some(d) = self.detector.feed_line(&line) {
                detections.push(d);
            }
        }

        // Prompts often arrive without a newline; feed the pending
        // fragment too, leaving it buffered.
        if let Some(fragment) = self.assembler.fragment().map(str::to_owned) {
            if let Some(d) = self.detector.feed_line(&fragment) {
                detections.push(d);
            }
        }

        for detection in detections {
            self.handle_idle(detection).await;
        }
    }

    /// Turn a detection into an `IdleEvent` and fan it out to the sinks.
    async fn handle_idle(&mut self, detection: IdleDetection) {
        let tool_name = self.registry.display_name(&detection.tool_key);

        let n = self.config.notifications.output_lines;
        let last_output = if detection.recent.is_empty() {
            String::new()
        } else {
            let skip = detection.recent.len().saturating_sub(n);
            detection.recent[skip..].join("\n")
        };

        let event = IdleEvent {
            session_id: self.session.session_id.clone(),
            tool_name,
            working_dir: self.session.working_dir.clone(),
            timestamp: Utc::now(),
            last_output: last_output.clone(),
            idle_seconds: detection.idle_seconds,
            detection_method: detection.method,
        };

        debug!(
            method = detection.method.as_str(),
            tool = %detection.tool_key,
            idle_seconds = detection.idle_seconds,
            "idle detected"
        );

        self.session.status = SessionStatus::Idle;
        self.session.last_output = last_output;
        self.session.last_idle_event = Some(event.clone());

        for sink in &self.sinks {
            sink.emit(&event).await;
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
