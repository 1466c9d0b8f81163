// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idle-prompt pattern registry.
//!
//! Patterns are loaded once at startup from the bundled defaults plus an
//! optional user file and are read-only afterwards. Tools are kept in
//! insertion order so `match_any` is deterministic; a user entry with a
//! built-in key replaces that entry in place.

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::config;

/// Bundled default patterns shipped with the binary.
const BUILTIN_PATTERNS: &str = include_str!("../patterns/defaults.yaml");

/// Compiled idle patterns for a single tool.
#[derive(Debug)]
pub struct ToolPattern {
    pub key: String,
    pub name: String,
    patterns: Vec<Regex>,
}

impl ToolPattern {
    /// True if any of this tool's idle patterns matches the line.
    pub fn matches(&self, line: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(line))
    }

    /// Source strings of the compiled patterns, for display.
    pub fn pattern_strs(&self) -> Vec<&str> {
        self.patterns.iter().map(Regex::as_str).collect()
    }
}

/// Registry of all loaded tool patterns plus the detection tunables.
#[derive(Debug)]
pub struct PatternRegistry {
    tools: IndexMap<String, ToolPattern>,
    pub timeout_seconds: u64,
    pub cooldown_seconds: u64,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self { tools: IndexMap::new(), timeout_seconds: 30, cooldown_seconds: 5 }
    }
}

impl PatternRegistry {
    /// Look up a tool by key.
    pub fn tool(&self, key: &str) -> Option<&ToolPattern> {
        self.tools.get(key)
    }

    /// Whether a tool key is known to the registry.
    pub fn contains(&self, key: &str) -> bool {
        self.tools.contains_key(key)
    }

    /// All tools in insertion order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolPattern> {
        self.tools.values()
    }

    /// Check a line against every tool in insertion order.
    ///
    /// Returns the key of the first tool with a matching pattern.
    pub fn match_any(&self, line: &str) -> Option<&str> {
        self.tools
            .values()
            .find(|tool| tool.matches(line))
            .map(|tool| tool.key.as_str())
    }

    /// Display name for a tool key, falling back to the key itself.
    pub fn display_name(&self, key: &str) -> String {
        match self.tools.get(key) {
            Some(tool) => tool.name.clone(),
            None => key.to_owned(),
        }
    }

    fn insert_tools(&mut self, entries: IndexMap<String, ToolEntry>) {
        for (key, entry) in entries {
            let name = entry.name.unwrap_or_else(|| key.clone());
            let patterns = compile_patterns(&entry.idle_patterns);
            self.tools.insert(key.clone(), ToolPattern { key, name, patterns });
        }
    }
}

/// One tool entry as it appears in a pattern file.
#[derive(Debug, Deserialize)]
struct ToolEntry {
    name: Option<String>,
    #[serde(default)]
    idle_patterns: Vec<String>,
}

/// Detection tunables as they appear in a pattern file.
#[derive(Debug, Deserialize)]
struct Tunables {
    timeout_seconds: Option<u64>,
    cooldown_seconds: Option<u64>,
}

/// Full shape of a pattern file. The builtin file uses `tools` +
/// `defaults`; a user file uses `custom_tools` + `overrides`.
#[derive(Debug, Deserialize)]
struct PatternsFile {
    #[serde(default)]
    tools: IndexMap<String, ToolEntry>,
    #[serde(default)]
    custom_tools: IndexMap<String, ToolEntry>,
    defaults: Option<Tunables>,
    overrides: Option<Tunables>,
}

/// Compile a list of regex strings, dropping invalid ones.
fn compile_patterns(raw: &[String]) -> Vec<Regex> {
    let mut compiled = Vec::with_capacity(raw.len());
    for pat in raw {
        match Regex::new(pat) {
            Ok(re) => compiled.push(re),
            Err(e) => tracing::warn!(pattern = %pat, err = %e, "dropping invalid idle pattern"),
        }
    }
    compiled
}

fn parse_file(source: &str) -> Option<PatternsFile> {
    match serde_yaml::from_str::<PatternsFile>(source) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!(err = %e, "skipping unreadable pattern file");
            None
        }
    }
}

/// Build a registry from the builtin document plus an optional user
/// document. User `custom_tools` extend the set; a colliding key replaces
/// the builtin entry in place. User `overrides` win over `defaults`.
pub fn load_from_strs(builtin: &str, user: Option<&str>) -> PatternRegistry {
    let mut registry = PatternRegistry::default();

    if let Some(file) = parse_file(builtin) {
        registry.insert_tools(file.tools);
        if let Some(defaults) = file.defaults {
            if let Some(t) = defaults.timeout_seconds {
                registry.timeout_seconds = t;
            }
            if let Some(c) = defaults.cooldown_seconds {
                registry.cooldown_seconds = c;
            }
        }
    }

    if let Some(file) = user.and_then(parse_file) {
        registry.insert_tools(file.custom_tools);
        if let Some(overrides) = file.overrides {
            if let Some(t) = overrides.timeout_seconds {
                registry.timeout_seconds = t;
            }
            if let Some(c) = overrides.cooldown_seconds {
                registry.cooldown_seconds = c;
            }
        }
    }

    registry
}

/// Load the registry from the bundled defaults and `~/.jigai/patterns.yaml`.
pub fn load() -> PatternRegistry {
    let user = std::fs::read_to_string(config::user_patterns_file()).ok();
    load_from_strs(BUILTIN_PATTERNS, user.as_deref())
}

/// Substring hints mapping a launch command to a tool key, checked in
/// order. The key must also exist in the registry for the hint to apply.
const COMMAND_HINTS: &[(&str, &[&str])] = &[
    ("claude_code", &["claude"]),
    ("codex", &["codex"]),
    ("gemini_cli", &["gemini"]),
    ("aider", &["aider"]),
    ("opencode", &["opencode"]),
];

/// Guess the tool key from the command being launched.
///
/// This only biases detection toward the right tool; `"unknown"` is a
/// fully supported answer.
pub fn detect_tool_from_command(command: &[String], registry: &PatternRegistry) -> String {
    if command.is_empty() {
        return "unknown".to_owned();
    }

    let cmd_str = command.join(" ").to_lowercase();

    for (tool_key, hints) in COMMAND_HINTS {
        if registry.contains(tool_key) && hints.iter().any(|hint| cmd_str.contains(hint)) {
            return (*tool_key).to_owned();
        }
    }

    "unknown".to_owned()
}

#[cfg(test)]
#[path = "patterns_tests.rs"]
mod tests;
