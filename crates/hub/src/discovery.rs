// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mDNS service announcement for LAN discovery of the hub.
//!
//! Registration is strictly best-effort: any failure is logged and the
//! hub keeps serving without it.

use std::net::UdpSocket;

use anyhow::Context;
use mdns_sd::{ServiceDaemon, ServiceInfo};

/// Service type announced on the LAN.
const SERVICE_TYPE: &str = "_jigai._tcp.local.";

/// Announces the hub's address via mDNS.
pub struct ServiceBroadcaster {
    port: u16,
    daemon: Option<ServiceDaemon>,
    fullname: Option<String>,
}

impl ServiceBroadcaster {
    pub fn new(port: u16) -> Self {
        Self { port, daemon: None, fullname: None }
    }

    /// Start broadcasting. Returns whether registration succeeded.
    pub fn start(&mut self) -> bool {
        match self.try_start() {
            Ok(fullname) => {
                tracing::info!(service = %fullname, "mDNS announcement started");
                true
            }
            Err(e) => {
                tracing::warn!(err = %e, "mDNS unavailable, LAN discovery disabled");
                false
            }
        }
    }

    fn try_start(&mut self) -> anyhow::Result<String> {
        let daemon = ServiceDaemon::new().context("mDNS daemon")?;

        let hostname = nix::unistd::gethostname()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_owned());
        let instance = format!("JigAi on {hostname}");
        let host = format!("{hostname}.local.");
        let ip = get_local_ip();

        let properties = [("version", env!("CARGO_PKG_VERSION")), ("hostname", hostname.as_str())];
        let info = ServiceInfo::new(
            SERVICE_TYPE,
            &instance,
            &host,
            ip.as_str(),
            self.port,
            &properties[..],
        )
        .context("mDNS service info")?;

        let fullname = info.get_fullname().to_owned();
        daemon.register(info).context("mDNS register")?;

        self.daemon = Some(daemon);
        self.fullname = Some(fullname.clone());
        Ok(fullname)
    }

    /// Retract the announcement.
    pub fn stop(&mut self) {
        if let (Some(daemon), Some(fullname)) = (self.daemon.take(), self.fullname.take()) {
            let _ = daemon.unregister(&fullname);
            let _ = daemon.shutdown();
        }
    }
}

impl Drop for ServiceBroadcaster {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Local LAN address of this machine.
///
/// Opens a UDP socket toward a public address to learn which interface
/// would route there; nothing is actually sent.
pub fn get_local_ip() -> String {
    let probe = || -> std::io::Result<String> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip().to_string())
    };
    probe().unwrap_or_else(|_| "127.0.0.1".to_owned())
}
