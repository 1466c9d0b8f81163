// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for the informational subcommands (`patterns`, `sessions`,
//! `config …`, `server status`). The `watch` flow lives in
//! [`crate::watcher`]; the hub itself lives in the `jigai-hub` crate.

use crate::config;
use crate::detector::strip_ansi;
use crate::hub_client::HubClient;
use crate::patterns;

/// `jigai patterns` — list every loaded idle pattern.
pub fn patterns_cmd() -> i32 {
    let registry = patterns::load();

    println!("Loaded idle patterns:");
    for tool in registry.tools() {
        println!("  {} ({})", tool.name, tool.key);
        for pat in tool.pattern_strs() {
            println!("      {pat}");
        }
    }
    println!();
    println!(
        "Timeout: {}s | Cooldown: {}s",
        registry.timeout_seconds, registry.cooldown_seconds
    );
    0
}

/// `jigai sessions` — query the hub for active sessions.
pub async fn sessions_cmd(port: u16) -> i32 {
    let client = HubClient::new(format!("http://localhost:{port}"));

    let body = match client.list_sessions().await {
        Ok(body) => body,
        Err(_) => {
            eprintln!("cannot connect to the jigai hub on port {port}");
            eprintln!("start it with: jigai server start");
            return 1;
        }
    };

    let sessions = body
        .get("sessions")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    if sessions.is_empty() {
        println!("No active sessions.");
        return 0;
    }

    println!("{:<10} {:<16} {:<8} working dir", "session", "tool", "status");
    for s in &sessions {
        println!(
            "{:<10} {:<16} {:<8} {}",
            s.get("session_id").and_then(|v| v.as_str()).unwrap_or("?"),
            s.get("tool_name").and_then(|v| v.as_str()).unwrap_or("?"),
            s.get("status").and_then(|v| v.as_str()).unwrap_or("?"),
            s.get("working_dir").and_then(|v| v.as_str()).unwrap_or(""),
        );
    }
    0
}

/// `jigai server status` — report hub reachability.
pub async fn server_status(port: u16) -> i32 {
    let client = HubClient::new(format!("http://localhost:{port}"));
    if client.is_running().await {
        println!("jigai hub is running on port {port}");
        0
    } else {
        println!("jigai hub is not running");
        println!("start it with: jigai server start");
        1
    }
}

/// Template written to a fresh `~/.jigai/patterns.yaml`.
const USER_PATTERNS_TEMPLATE: &str = "\
# jigai — custom tool patterns
# Add your own tools here.
#
# custom_tools:
#   my_agent:
#     name: \"My Custom Agent\"
#     idle_patterns:
#       - 'READY>'
#       - 'awaiting instruction'
#
# overrides:
#   timeout_seconds: 45
";

/// `jigai config init` — create the default config files.
pub fn config_init() -> i32 {
    if let Err(e) = config::ensure_dirs() {
        eprintln!("cannot create {}: {e}", config::jigai_dir().display());
        return 1;
    }

    let config_path = config::config_file();
    if config_path.exists() {
        println!("config already exists: {}", config_path.display());
    } else {
        match config::save_default() {
            Ok(path) => println!("created config: {}", path.display()),
            Err(e) => {
                eprintln!("cannot write config: {e}");
                return 1;
            }
        }
    }

    let patterns_path = config::user_patterns_file();
    if patterns_path.exists() {
        println!("patterns already exist: {}", patterns_path.display());
    } else if let Err(e) = std::fs::write(&patterns_path, USER_PATTERNS_TEMPLATE) {
        eprintln!("cannot write patterns: {e}");
        return 1;
    } else {
        println!("created patterns: {}", patterns_path.display());
    }
    0
}

/// `jigai config show` — print the effective configuration.
pub fn config_show() -> i32 {
    let config = config::load();
    match serde_yaml::to_string(&config) {
        Ok(rendered) => {
            print!("{rendered}");
            0
        }
        Err(e) => {
            eprintln!("cannot render config: {e}");
            1
        }
    }
}

/// `jigai config test <line>` — check a line against every idle pattern.
pub fn config_test(line: &str) -> i32 {
    let registry = patterns::load();
    let clean = strip_ansi(line);
    let clean = clean.trim();

    println!("testing: {clean}");
    println!();

    let mut matched = false;
    for tool in registry.tools() {
        if tool.matches(clean) {
            println!("  MATCH -> {} ({})", tool.name, tool.key);
            matched = true;
        }
    }

    if !matched {
        println!("  no pattern matched");
        println!(
            "  the timeout fallback would fire after {}s of silence",
            registry.timeout_seconds
        );
    }
    0
}
