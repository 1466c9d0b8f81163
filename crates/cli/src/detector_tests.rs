// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::{now_secs, strip_ansi, DetectionMethod, Detector};
use crate::patterns::{load_from_strs, PatternRegistry};

fn make_registry(timeout: u64, cooldown: u64) -> Arc<PatternRegistry> {
    let yaml = format!(
        r"
tools:
  claude_code:
    name: 'Claude Code'
    idle_patterns:
      - '>>\s*$'
      - '(?i)waiting for.*input'
  codex:
    name: 'Codex'
    idle_patterns:
      - '(?i)codex>\s*$'
defaults:
  timeout_seconds: {timeout}
  cooldown_seconds: {cooldown}
"
    );
    Arc::new(load_from_strs(&yaml, None))
}

fn detector(timeout: u64, cooldown: u64, hint: Option<&str>) -> Detector {
    Detector::new(make_registry(timeout, cooldown), hint.map(str::to_owned))
}

// -- strip_ansi ---------------------------------------------------------------

#[test]
fn strip_ansi_plain_text() {
    assert_eq!(strip_ansi("hello world"), "hello world");
}

#[test]
fn strip_ansi_color_codes() {
    assert_eq!(strip_ansi("\x1b[32mgreen\x1b[0m"), "green");
}

#[test]
fn strip_ansi_complex_sequences() {
    assert_eq!(strip_ansi("\x1b[1;34mBold Blue\x1b[0m text"), "Bold Blue text");
}

#[test]
fn strip_ansi_osc_sequences() {
    assert_eq!(strip_ansi("\x1b]0;Window Title\x07rest"), "rest");
}

#[test]
fn strip_ansi_empty_string() {
    assert_eq!(strip_ansi(""), "");
}

// -- Pattern detection --------------------------------------------------------

#[test]
fn pattern_fires_on_prompt() {
    let mut det = detector(5, 0, None);

    assert!(det.feed_line("Some normal output").is_none());
    assert!(det.feed_line("More output here").is_none());
    let hit = det.feed_line(">> ");

    let hit = hit.unwrap();
    assert_eq!(hit.method, DetectionMethod::Pattern);
    assert_eq!(hit.tool_key, "claude_code");
    assert!(hit.recent.contains(&"Some normal output".to_owned()));
    assert!(hit.recent.contains(&"More output here".to_owned()));
}

#[test]
fn tool_hint_checked_first() {
    let mut det = detector(5, 0, Some("claude_code"));
    let hit = det.feed_line(">> ").unwrap();
    assert_eq!(hit.tool_key, "claude_code");
}

#[test]
fn hint_not_in_registry_falls_back_to_match_any() {
    let mut det = detector(5, 0, Some("no_such_tool"));
    let hit = det.feed_line("codex> ").unwrap();
    assert_eq!(hit.tool_key, "codex");
}

#[test]
fn cooldown_prevents_rapid_fire() {
    let mut det = detector(5, 10, None);

    let first = det.feed_line(">> ");
    let second = det.feed_line(">> ");
    let third = det.feed_line(">> ");

    assert!(first.is_some());
    assert!(second.is_none());
    assert!(third.is_none());
}

#[test]
fn cooldown_of_exactly_cooldown_seconds_permits_next_fire() {
    let mut det = detector(5, 5, None);
    assert!(det.feed_line(">> ").is_some());
    assert!(det.feed_line(">> ").is_none());

    // Rewind the notification stamp by exactly the cooldown.
    det.state.last_idle_notification -= 5.0;
    assert!(det.feed_line(">> ").is_some());
}

#[test]
fn empty_lines_ignored() {
    let mut det = detector(5, 0, None);
    assert!(det.feed_line("").is_none());
    assert!(det.feed_line("   ").is_none());
    assert!(det.feed_line("\n").is_none());
    assert_eq!(det.recent_output(10).len(), 0);
}

#[test]
fn ansi_wrapped_prompt_still_matches() {
    let mut det = detector(5, 0, None);
    let hit = det.feed_line("\x1b[32m>> \x1b[0m").unwrap();
    assert_eq!(hit.tool_key, "claude_code");
}

#[test]
fn match_decision_equals_decision_on_stripped_line() {
    let registry = make_registry(5, 0);
    let raw = "\x1b[1;34m>> \x1b[0m";
    let stripped = strip_ansi(raw);
    assert_eq!(
        registry.match_any(stripped.trim()),
        registry.match_any(strip_ansi(stripped.trim()).trim()),
    );
}

// -- Redaction ----------------------------------------------------------------

#[test]
fn secrets_redacted_in_ring() {
    let mut det = detector(5, 0, None);
    det.set_redact_patterns(&[r"(?i)(token|password)=\S+".to_owned()]);

    det.feed_line("Setting token=abc123secret");
    det.feed_line("password=hunter2");
    let hit = det.feed_line(">> ").unwrap();

    assert!(hit.recent.iter().any(|l| l.contains("[REDACTED]")));
    assert!(!hit.recent.iter().any(|l| l.contains("abc123secret")));
    assert!(!hit.recent.iter().any(|l| l.contains("hunter2")));
}

#[test]
fn matching_runs_on_unredacted_line() {
    // The prompt itself contains a secret; redaction must not stop the
    // pattern from seeing it.
    let yaml = r"
tools:
  secretive:
    name: 'Secretive'
    idle_patterns:
      - 'token=\S+ >>$'
defaults:
  timeout_seconds: 30
  cooldown_seconds: 0
";
    let mut det = Detector::new(Arc::new(load_from_strs(yaml, None)), None);
    det.set_redact_patterns(&[r"token=\S+".to_owned()]);

    let hit = det.feed_line("token=abc123 >>").unwrap();
    assert_eq!(hit.tool_key, "secretive");
    assert!(hit.recent.iter().all(|l| !l.contains("abc123")));
}

#[test]
fn invalid_redact_pattern_dropped() {
    let mut det = detector(5, 0, None);
    det.set_redact_patterns(&["[invalid".to_owned(), r"token=\S+".to_owned()]);
    det.feed_line("token=abc");
    assert_eq!(det.recent_output(1), vec!["[REDACTED]".to_owned()]);
}

// -- Timeout detection --------------------------------------------------------

#[test]
fn timeout_triggers_after_silence() {
    let mut det = detector(1, 0, None);
    det.feed_line("Some output");

    det.state.last_output_time = now_secs() - 2.0;
    let hit = det.check_timeout().unwrap();

    assert_eq!(hit.method, DetectionMethod::Timeout);
    assert_eq!(hit.tool_key, "unknown");
    assert!(hit.idle_seconds >= 2.0);
}

#[test]
fn timeout_does_not_retrigger_while_idle() {
    let mut det = detector(1, 0, None);
    det.feed_line("Some output");
    det.state.last_output_time = now_secs() - 2.0;

    assert!(det.check_timeout().is_some());
    assert!(det.check_timeout().is_none());
    assert!(det.check_timeout().is_none());
}

#[test]
fn timeout_uses_hint_as_tool_key() {
    let mut det = detector(1, 0, Some("claude_code"));
    det.state.last_output_time = now_secs() - 2.0;
    assert_eq!(det.check_timeout().unwrap().tool_key, "claude_code");
}

#[test]
fn new_output_resets_idle() {
    let mut det = detector(1, 0, None);
    det.feed_line("Some output");
    det.state.last_output_time = now_secs() - 2.0;
    assert!(det.check_timeout().is_some());
    assert!(det.is_idle());

    det.feed_line("New output arrived");
    assert!(!det.is_idle());
}

#[test]
fn timeout_below_threshold_does_not_fire() {
    let mut det = detector(5, 0, None);
    det.feed_line("Some output");
    det.state.last_output_time = now_secs() - 4.0;
    assert!(det.check_timeout().is_none());
}

#[test]
fn timeout_of_exactly_timeout_seconds_fires() {
    let mut det = detector(5, 0, None);
    det.feed_line("Some output");
    det.state.last_output_time = now_secs() - 5.0;
    assert!(det.check_timeout().is_some());
}

// -- Ring ---------------------------------------------------------------------

#[test]
fn ring_keeps_last_fifty_lines() {
    let mut det = detector(30, 0, None);
    for i in 1..=51 {
        det.feed_line(&format!("line {i}"));
    }

    let all = det.recent_output(100);
    assert_eq!(all.len(), 50);
    assert_eq!(all[0], "line 2");
    assert_eq!(all[49], "line 51");
}

#[test]
fn recent_output_returns_last_n() {
    let mut det = detector(30, 0, None);
    for i in 0..10 {
        det.feed_line(&format!("Line {i}"));
    }

    let recent = det.recent_output(3);
    assert_eq!(recent, vec!["Line 7", "Line 8", "Line 9"]);
}

#[test]
fn detection_carries_at_most_ten_recent_lines() {
    let mut det = detector(30, 0, None);
    for i in 0..20 {
        det.feed_line(&format!("Line {i}"));
    }
    let hit = det.feed_line(">> ").unwrap();
    assert_eq!(hit.recent.len(), 10);
    assert_eq!(hit.recent[9], ">> ");
}
