// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification sink.
//!
//! Shells out to the platform notifier (terminal-notifier / osascript on
//! macOS, notify-send elsewhere). Notifications are best-effort: every
//! failure is swallowed. Inputs are sanitized exactly once, here, so that
//! embedded quotes cannot terminate the generated script.

use std::future::Future;
use std::pin::Pin;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::config::NotificationConfig;
use crate::session::IdleEvent;
use crate::watcher::IdleSink;

/// App names that count as "the user is looking at a terminal".
const TERMINAL_APPS: &[&str] =
    &["terminal", "iterm2", "warp", "hyper", "alacritty", "kitty", "ghostty", "tabby", "rio"];

/// Deadline for the focus probe.
const FOCUS_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Deadline for the notifier process itself.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

// Pure separator lines (box drawing, dashes, equals, pipes) carry no
// information for a notification body.
static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    let re = Regex::new(r"^[\s\u{2500}-\u{257F}\-=_|*~\u{2014}\u{2013}]+$")
        .expect("separator pattern is a valid regex");
    re
});

// Decorative glyphs stripped from inside otherwise meaningful lines.
static DECOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    let re = Regex::new(
        r"[\u{2500}-\u{257F}\u{2580}-\u{259F}\u{25A0}-\u{25FF}\u{2600}-\u{26FF}●✻⚡✓►▶⚠\-─━╭╮╰╯│]",
    )
    .expect("decoration pattern is a valid regex");
    re
});

// A line counts as meaningful only with a run of 3+ ASCII letters left.
static HAS_ALPHA: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    let re = Regex::new(r"[a-zA-Z]{3,}").expect("alpha pattern is a valid regex");
    re
});

/// Escape text for embedding in a quoted notifier script.
///
/// Backslashes are escaped before quotes; newlines become a visible
/// glyph. Callers apply this exactly once on the final string.
pub fn sanitize(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ⏎ ")
}

/// Return the last line with real readable content from a block of text.
///
/// AI tool TUIs emit box-drawing separators and prompt frames around the
/// text that matters; walk from the end, skip separator-only lines, strip
/// decorations, and take the first line that still reads as prose.
pub fn last_meaningful_line(text: &str) -> String {
    for line in text.split('\n').rev() {
        let stripped = line.trim();
        if stripped.is_empty() || SEPARATOR_RE.is_match(stripped) {
            continue;
        }
        let cleaned = DECOR_RE.replace_all(stripped, "");
        let cleaned = cleaned.trim();
        if HAS_ALPHA.is_match(cleaned) {
            return cleaned.to_owned();
        }
    }
    String::new()
}

/// Shorten a path for display: home becomes `~`, long paths keep the
/// root plus the last two components.
pub fn shorten_path(path: &str, max_len: usize) -> String {
    let mut path = path.to_owned();
    if let Some(home) = dirs::home_dir() {
        let home = home.to_string_lossy().into_owned();
        if path.starts_with(&home) {
            path = format!("~{}", &path[home.len()..]);
        }
    }
    if path.len() > max_len {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() > 3 {
            path = format!("{}/.../{}/{}", parts[0], parts[parts.len() - 2], parts[parts.len() - 1]);
        }
    }
    path
}

/// True if a terminal app currently owns the frontmost window.
///
/// Any probe failure means "can't tell" and allows the notification.
pub async fn is_terminal_focused() -> bool {
    let probe = tokio::process::Command::new("osascript")
        .args([
            "-e",
            "tell application \"System Events\" to get name of first \
             application process whose frontmost is true",
        ])
        .output();

    match tokio::time::timeout(FOCUS_PROBE_TIMEOUT, probe).await {
        Ok(Ok(out)) => {
            let frontmost = String::from_utf8_lossy(&out.stdout).trim().to_lowercase();
            TERMINAL_APPS.iter().any(|term| frontmost.contains(term))
        }
        _ => false,
    }
}

/// Idle sink that raises a desktop notification.
pub struct DesktopNotifier {
    config: NotificationConfig,
}

impl DesktopNotifier {
    pub fn new(config: NotificationConfig) -> Self {
        Self { config }
    }

    async fn deliver(&self, title: &str, message: &str, subtitle: &str, group: Option<&str>) {
        let title = sanitize(title);
        let message = sanitize(message);
        let subtitle = sanitize(subtitle);
        notify_platform(&title, &message, &subtitle, &self.config.sound, group).await;
    }
}

impl IdleSink for DesktopNotifier {
    fn emit<'a>(&'a self, event: &'a IdleEvent) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if self.config.only_when_away && is_terminal_focused().await {
                return;
            }

            let title = format!("{} is waiting", event.tool_name);
            let subtitle = format!("Session: {}-{}", event.tool_name, event.session_id);

            let mut body = if self.config.show_last_output {
                last_meaningful_line(&event.last_output)
            } else {
                String::new()
            };
            if !event.working_dir.is_empty() {
                let dir = shorten_path(&event.working_dir, 40);
                body = if body.is_empty() { dir } else { format!("{body}\n{dir}") };
            }

            let group = self.config.group_by_session.then(|| event.session_id.clone());
            self.deliver(&title, &body, &subtitle, group.as_deref()).await;
        })
    }
}

#[cfg(target_os = "macos")]
async fn notify_platform(title: &str, message: &str, subtitle: &str, sound: &str, group: Option<&str>) {
    // terminal-notifier first (richer features); osascript fallback ships
    // with the OS.
    let mut cmd = tokio::process::Command::new("terminal-notifier");
    cmd.args(["-title", title, "-message", message, "-sound", sound]);
    if !subtitle.is_empty() {
        cmd.args(["-subtitle", subtitle]);
    }
    if let Some(group) = group {
        cmd.arg("-group");
        cmd.arg(format!("jigai-{group}"));
    }

    if run_quietly(cmd).await {
        return;
    }

    let mut script = format!("display notification \"{message}\" with title \"{title}\"");
    if !subtitle.is_empty() {
        script.push_str(&format!(" subtitle \"{subtitle}\""));
    }
    script.push_str(&format!(" sound name \"{sound}\""));

    let mut cmd = tokio::process::Command::new("osascript");
    cmd.args(["-e", &script]);
    run_quietly(cmd).await;
}

#[cfg(not(target_os = "macos"))]
async fn notify_platform(title: &str, message: &str, subtitle: &str, _sound: &str, _group: Option<&str>) {
    let body = if subtitle.is_empty() {
        message.to_owned()
    } else {
        format!("{subtitle}\n{message}")
    };
    let mut cmd = tokio::process::Command::new("notify-send");
    cmd.arg(title);
    cmd.arg(body);
    run_quietly(cmd).await;
}

/// Run a notifier command, discarding output. Returns success.
async fn run_quietly(mut cmd: tokio::process::Command) -> bool {
    cmd.stdout(std::process::Stdio::null());
    cmd.stderr(std::process::Stdio::null());
    match tokio::time::timeout(NOTIFY_TIMEOUT, cmd.output()).await {
        Ok(Ok(out)) => out.status.success(),
        _ => false,
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
