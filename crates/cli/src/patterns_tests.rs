// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{detect_tool_from_command, load_from_strs, PatternRegistry, BUILTIN_PATTERNS};

fn builtin() -> PatternRegistry {
    load_from_strs(BUILTIN_PATTERNS, None)
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// -- Compilation --------------------------------------------------------------

#[test]
fn invalid_patterns_dropped_others_kept() {
    let yaml = r"
tools:
  mixed:
    name: 'Mixed'
    idle_patterns:
      - 'valid'
      - '[invalid'
      - 'also_valid'
";
    let registry = load_from_strs(yaml, None);
    let tool = registry.tool("mixed").unwrap();
    assert_eq!(tool.pattern_strs(), vec!["valid", "also_valid"]);
}

#[test]
fn tool_without_name_uses_key() {
    let yaml = "
tools:
  bare:
    idle_patterns:
      - 'x'
";
    let registry = load_from_strs(yaml, None);
    assert_eq!(registry.display_name("bare"), "bare");
}

// -- Builtin file -------------------------------------------------------------

#[test]
fn builtin_has_known_tools() {
    let registry = builtin();
    for key in ["claude_code", "codex", "gemini_cli", "aider", "opencode"] {
        assert!(registry.contains(key), "missing builtin tool {key}");
    }
}

#[test]
fn builtin_patterns_all_compile() {
    let registry = builtin();
    for tool in registry.tools() {
        assert!(!tool.pattern_strs().is_empty(), "{} has no compiled patterns", tool.key);
    }
}

#[test]
fn builtin_tunables() {
    let registry = builtin();
    assert_eq!(registry.timeout_seconds, 30);
    assert_eq!(registry.cooldown_seconds, 5);
}

// -- match_any ----------------------------------------------------------------

#[test]
fn match_any_returns_first_match_in_insertion_order() {
    let yaml = r"
tools:
  tool_a:
    name: 'Tool A'
    idle_patterns:
      - 'prompt_a>'
  tool_b:
    name: 'Tool B'
    idle_patterns:
      - 'prompt_b>'
";
    let registry = load_from_strs(yaml, None);
    assert_eq!(registry.match_any("prompt_a> "), Some("tool_a"));
    assert_eq!(registry.match_any("prompt_b> "), Some("tool_b"));
    assert_eq!(registry.match_any("random text"), None);
}

#[test]
fn match_any_is_total_on_arbitrary_lines() {
    let registry = builtin();
    for line in ["", "   ", "¯\\_(ツ)_/¯", "\u{0}null byte\u{0}", "very normal words"] {
        let _ = registry.match_any(line);
    }
}

// -- User overrides -----------------------------------------------------------

#[test]
fn user_tools_extend_registry() {
    let user = r"
custom_tools:
  my_agent:
    name: 'My Agent'
    idle_patterns:
      - 'READY>'
";
    let registry = load_from_strs(BUILTIN_PATTERNS, Some(user));
    assert!(registry.contains("my_agent"));
    assert_eq!(registry.match_any("READY> "), Some("my_agent"));
}

#[test]
fn user_key_replaces_builtin_in_place() {
    let builtin = r"
tools:
  alpha:
    name: 'Alpha'
    idle_patterns:
      - 'alpha>'
  beta:
    name: 'Beta'
    idle_patterns:
      - 'beta>'
  gamma:
    name: 'Gamma'
    idle_patterns:
      - 'gamma>'
";
    let user = r"
custom_tools:
  beta:
    name: 'Beta Prime'
    idle_patterns:
      - 'BETA>'
  delta:
    name: 'Delta'
    idle_patterns:
      - 'delta>'
";
    let registry = load_from_strs(builtin, Some(user));

    let keys: Vec<&str> = registry.tools().map(|t| t.key.as_str()).collect();
    assert_eq!(keys, vec!["alpha", "beta", "gamma", "delta"]);

    assert_eq!(registry.display_name("beta"), "Beta Prime");
    assert_eq!(registry.match_any("BETA> "), Some("beta"));
    assert_eq!(registry.match_any("beta> "), None);
}

#[test]
fn user_overrides_win_over_defaults() {
    let user = "
overrides:
  timeout_seconds: 45
  cooldown_seconds: 2
";
    let registry = load_from_strs(BUILTIN_PATTERNS, Some(user));
    assert_eq!(registry.timeout_seconds, 45);
    assert_eq!(registry.cooldown_seconds, 2);
}

#[test]
fn unreadable_user_file_is_skipped() {
    let registry = load_from_strs(BUILTIN_PATTERNS, Some(": not valid yaml ["));
    assert!(registry.contains("claude_code"));
    assert_eq!(registry.timeout_seconds, 30);
}

#[test]
fn load_is_idempotent() {
    let user = "
custom_tools:
  my_agent:
    name: 'My Agent'
    idle_patterns:
      - 'READY>'
overrides:
  timeout_seconds: 45
";
    let a = load_from_strs(BUILTIN_PATTERNS, Some(user));
    let b = load_from_strs(BUILTIN_PATTERNS, Some(user));

    let keys_a: Vec<&str> = a.tools().map(|t| t.key.as_str()).collect();
    let keys_b: Vec<&str> = b.tools().map(|t| t.key.as_str()).collect();
    assert_eq!(keys_a, keys_b);
    for (ta, tb) in a.tools().zip(b.tools()) {
        assert_eq!(ta.name, tb.name);
        assert_eq!(ta.pattern_strs(), tb.pattern_strs());
    }
    assert_eq!(a.timeout_seconds, b.timeout_seconds);
    assert_eq!(a.cooldown_seconds, b.cooldown_seconds);
}

// -- Command detection --------------------------------------------------------

#[test]
fn detect_claude() {
    assert_eq!(detect_tool_from_command(&args(&["claude"]), &builtin()), "claude_code");
}

#[test]
fn detect_codex() {
    assert_eq!(detect_tool_from_command(&args(&["codex"]), &builtin()), "codex");
}

#[test]
fn detect_gemini() {
    assert_eq!(detect_tool_from_command(&args(&["gemini"]), &builtin()), "gemini_cli");
}

#[test]
fn detect_aider() {
    assert_eq!(detect_tool_from_command(&args(&["aider"]), &builtin()), "aider");
}

#[test]
fn detect_opencode() {
    assert_eq!(detect_tool_from_command(&args(&["opencode"]), &builtin()), "opencode");
}

#[test]
fn detect_with_extra_args() {
    assert_eq!(
        detect_tool_from_command(&args(&["claude", "--model", "sonnet"]), &builtin()),
        "claude_code"
    );
}

#[test]
fn unknown_command() {
    assert_eq!(detect_tool_from_command(&args(&["python", "my_script.py"]), &builtin()), "unknown");
}

#[test]
fn empty_command() {
    assert_eq!(detect_tool_from_command(&[], &builtin()), "unknown");
}

#[test]
fn hint_requires_key_in_registry() {
    // A registry without codex cannot produce the codex hint.
    let yaml = r"
tools:
  claude_code:
    name: 'Claude Code'
    idle_patterns:
      - '>>\s*$'
";
    let registry = load_from_strs(yaml, None);
    assert_eq!(detect_tool_from_command(&args(&["codex"]), &registry), "unknown");
}
