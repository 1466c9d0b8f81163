// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the jigai hub.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "jigai-hub", version, about = "Idle-event hub for watched AI coding sessions.")]
pub struct HubConfig {
    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "JIGAI_HUB_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9384, env = "JIGAI_HUB_PORT")]
    pub port: u16,

    /// Disable mDNS service announcement.
    #[arg(long, env = "JIGAI_HUB_NO_MDNS")]
    pub no_mdns: bool,
}
