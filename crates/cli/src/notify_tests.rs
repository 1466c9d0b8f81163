// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use super::{is_terminal_focused, last_meaningful_line, sanitize, shorten_path};

// -- sanitize -----------------------------------------------------------------

#[test]
fn plain_text_unchanged() {
    assert_eq!(sanitize("hello world"), "hello world");
}

#[test]
fn quotes_escaped() {
    assert_eq!(sanitize(r#"say "hello""#), r#"say \"hello\""#);
}

#[test]
fn single_quote_char() {
    assert_eq!(sanitize(r#"""#), r#"\""#);
}

#[test]
fn existing_backslashes_doubled() {
    assert_eq!(sanitize(r"path\to\file"), r"path\\to\\file");
}

#[test]
fn backslash_then_quote() {
    // Backslashes are escaped before quotes; the already-escaped quote
    // input `\"` becomes `\\\"`, not `\\\\"`.
    assert_eq!(sanitize(r#"\""#), r#"\\\""#);
}

#[test]
fn newline_replaced_with_glyph() {
    assert_eq!(sanitize("line1\nline2"), "line1 ⏎ line2");
}

proptest! {
    /// A single application escapes backslashes before quotes: every
    /// original backslash doubles and every quote gains exactly one.
    #[test]
    fn sanitize_escape_accounting(s in "[ -~\n]{0,80}") {
        let out = sanitize(&s);
        let in_backslashes = s.matches('\\').count();
        let in_quotes = s.matches('"').count();

        prop_assert!(!out.contains('\n'));
        prop_assert_eq!(out.matches('"').count(), in_quotes);
        prop_assert_eq!(out.matches('\\').count(), 2 * in_backslashes + in_quotes);
    }
}

// -- last_meaningful_line -----------------------------------------------------

#[test]
fn plain_line_returned() {
    assert_eq!(last_meaningful_line("hello world"), "hello world");
}

#[test]
fn returns_last_real_line() {
    assert_eq!(last_meaningful_line("Running tests\nAll tests passed\n"), "All tests passed");
}

#[test]
fn skips_separator_lines() {
    assert_eq!(last_meaningful_line("Real content here\n─────────────────"), "Real content here");
}

#[test]
fn skips_box_drawing_frames() {
    let text = "Useful message\n╭──────────────────╮\n│                  │";
    assert_eq!(last_meaningful_line(text), "Useful message");
}

#[test]
fn skips_dash_separator() {
    assert_eq!(
        last_meaningful_line("Some output\n-----------------------------------"),
        "Some output"
    );
}

#[test]
fn strips_decorative_chars() {
    let result = last_meaningful_line("✻ Thinking…");
    assert!(result.contains("Thinking"));
    assert!(!result.contains('✻'));
}

#[test]
fn empty_input_gives_empty() {
    assert_eq!(last_meaningful_line(""), "");
}

#[test]
fn only_separators_gives_empty() {
    assert_eq!(last_meaningful_line("─────────\n==========\n----------"), "");
}

#[test]
fn requires_three_consecutive_letters() {
    assert_eq!(last_meaningful_line("─────────\nok\n─────────"), "");
}

#[test]
fn typical_tui_block() {
    let text = "╭─ ✻ Thinking… ──────────────────╮\n\
                │                                 │\n\
                ╰─────────────────────────────────╯\n\
                Here is my plan for the refactor";
    let result = last_meaningful_line(text);
    assert!(result.contains("plan") || result.contains("refactor"));
}

// -- shorten_path -------------------------------------------------------------

#[test]
fn home_becomes_tilde() {
    let Some(home) = dirs::home_dir() else { return };
    let home = home.to_string_lossy().into_owned();
    let result = shorten_path(&format!("{home}/projects/foo"), 40);
    assert!(result.starts_with('~'));
    assert!(!result.contains(&home));
}

#[test]
fn short_path_unchanged() {
    assert_eq!(shorten_path("/tmp/foo", 40), "/tmp/foo");
}

#[test]
fn long_path_truncated() {
    let path = "/a/b/c/d/e/f/g/h/i/j/k/l/m/n/o/p/q/r/s/t/u/v";
    let result = shorten_path(path, 20);
    assert!(result.contains("..."));
    assert!(result.len() <= path.len());
}

#[test]
fn truncated_path_keeps_last_two_parts() {
    let result = shorten_path("/a/b/c/d/this_project/src", 10);
    assert!(result.contains("this_project"));
    assert!(result.contains("src"));
}

// -- focus probe --------------------------------------------------------------

#[tokio::test]
async fn focus_probe_never_errors() {
    // On machines without osascript this resolves false; either way the
    // probe must not hang or panic.
    let _ = is_terminal_focused().await;
}
