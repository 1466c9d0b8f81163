// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered YAML configuration under `~/.jigai/`.
//!
//! A missing config file means defaults; an unreadable one is logged and
//! ignored. Configuration failures are never fatal to a watch.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Notification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Send desktop notifications at all.
    pub desktop: bool,
    /// Skip the desktop notification when a terminal is the focused app.
    pub only_when_away: bool,
    pub sound: String,
    pub group_by_session: bool,
    pub show_last_output: bool,
    /// Trailing output lines included in an idle event.
    pub output_lines: usize,
    /// Regexes whose matches are replaced with `[REDACTED]` before any
    /// line is retained.
    pub redact_patterns: Vec<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            only_when_away: false,
            sound: "Ping".to_owned(),
            group_by_session: true,
            show_last_output: true,
            output_lines: 3,
            redact_patterns: vec![r"(?i)(token|password|secret|key|api_key)=\S+".to_owned()],
        }
    }
}

/// Detection engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub timeout_seconds: u64,
    pub cooldown_seconds: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30, cooldown_seconds: 5 }
    }
}

/// Hub server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 9384, bind: "0.0.0.0".to_owned() }
    }
}

/// Session display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDisplayConfig {
    pub show_working_dir: bool,
    pub show_last_output: bool,
}

impl Default for SessionDisplayConfig {
    fn default() -> Self {
        Self { show_working_dir: true, show_last_output: true }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JigaiConfig {
    pub server: ServerConfig,
    pub notifications: NotificationConfig,
    pub detection: DetectionConfig,
    pub sessions: SessionDisplayConfig,
}

/// `~/.jigai`.
pub fn jigai_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".jigai")
}

/// `~/.jigai/config.yaml`.
pub fn config_file() -> PathBuf {
    jigai_dir().join("config.yaml")
}

/// `~/.jigai/patterns.yaml` (user pattern extensions).
pub fn user_patterns_file() -> PathBuf {
    jigai_dir().join("patterns.yaml")
}

/// Create the jigai directory if absent.
pub fn ensure_dirs() -> anyhow::Result<()> {
    std::fs::create_dir_all(jigai_dir())?;
    Ok(())
}

/// Parse a config document, falling back to defaults on error.
pub fn parse(source: &str) -> JigaiConfig {
    match serde_yaml::from_str(source) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(err = %e, "unreadable config, using defaults");
            JigaiConfig::default()
        }
    }
}

/// Load a config file, falling back to defaults when absent.
pub fn load_from(path: &std::path::Path) -> JigaiConfig {
    match std::fs::read_to_string(path) {
        Ok(source) => parse(&source),
        Err(_) => JigaiConfig::default(),
    }
}

/// Load `~/.jigai/config.yaml`, falling back to defaults.
pub fn load() -> JigaiConfig {
    load_from(&config_file())
}

/// Write the default config to `~/.jigai/config.yaml`.
pub fn save_default() -> anyhow::Result<PathBuf> {
    ensure_dirs()?;
    let path = config_file();
    let rendered = serde_yaml::to_string(&JigaiConfig::default())?;
    std::fs::write(&path, rendered)?;
    Ok(path)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
