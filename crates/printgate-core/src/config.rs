// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default HTTP port for the gateway.
pub const DEFAULT_PORT: u16 = 3888;

/// Persistent gateway settings.
///
/// Loaded from `config.json` in the data directory when present; CLI flags
/// are layered on top by the server binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Port the HTTP gateway listens on.
    pub port: u16,
    /// Bind on all interfaces instead of loopback only.
    pub enable_external_access: bool,
    /// Origins allowed in addition to the persisted allowlist file.
    pub allowed_origins: Vec<String>,
    /// Base URI of the CUPS scheduler.
    pub cups_uri: String,
    /// Print systems to probe at startup, most preferred first.
    pub print_systems: Vec<String>,
    /// Delay before the first job-status poll.
    pub poll_initial_delay_ms: u64,
    /// Delay between subsequent job-status polls.
    pub poll_interval_ms: u64,
    /// Upper bound on how long a synchronous print request waits.
    ///
    /// Kept under the 30 s timeout that most reverse proxies apply.
    pub poll_max_wait_ms: u64,
    /// Maximum number of requests served at the same time.
    pub max_concurrent_requests: usize,
    /// Maximum accepted request body size.
    pub max_body_bytes: usize,
    /// Darkness threshold (percent) used when binarizing label images.
    pub label_threshold: u8,
    /// Program used to rasterize PDF pages for label printers.
    pub pdf_rasterizer: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            enable_external_access: false,
            allowed_origins: Vec::new(),
            cups_uri: "ipp://localhost:631".into(),
            print_systems: vec!["cups".into(), "brother_ql".into()],
            poll_initial_delay_ms: 100,
            poll_interval_ms: 1000,
            poll_max_wait_ms: 25_000,
            max_concurrent_requests: 20,
            max_body_bytes: 64 * 1024 * 1024,
            label_threshold: 70,
            pdf_rasterizer: "pdftoppm".into(),
        }
    }
}

impl AppConfig {
    /// Read a JSON config file. A missing file yields the defaults; a file
    /// that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// The CUPS base URI, honouring a `CUPS_SERVER` host override.
    ///
    /// Domain-socket paths in `CUPS_SERVER` are ignored because IPP here is
    /// always spoken over TCP.
    pub fn effective_cups_uri(&self) -> String {
        match std::env::var("CUPS_SERVER") {
            Ok(server) => cups_uri_from_server(&server).unwrap_or_else(|| self.cups_uri.clone()),
            Err(_) => self.cups_uri.clone(),
        }
    }

    pub fn poll_initial_delay(&self) -> Duration {
        Duration::from_millis(self.poll_initial_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_max_wait(&self) -> Duration {
        Duration::from_millis(self.poll_max_wait_ms)
    }

    /// Whether the named print system should be probed at startup.
    pub fn print_system_enabled(&self, name: &str) -> bool {
        self.print_systems.iter().any(|s| s == name)
    }
}

fn cups_uri_from_server(server: &str) -> Option<String> {
    let server = server.trim();
    if server.is_empty() || server.starts_with('/') {
        return None;
    }
    if server.contains("://") {
        return Some(server.to_string());
    }
    if server.contains(':') {
        Some(format!("ipp://{server}"))
    } else {
        Some(format!("ipp://{server}:631"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.poll_max_wait_ms, 25_000);
        assert!(config.print_system_enabled("cups"));
        assert!(config.print_system_enabled("brother_ql"));
    }

    #[test]
    fn missing_file_means_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/printgate/config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn cups_server_host_gets_default_port() {
        assert_eq!(
            cups_uri_from_server("printhost").as_deref(),
            Some("ipp://printhost:631")
        );
        assert_eq!(
            cups_uri_from_server("printhost:8631").as_deref(),
            Some("ipp://printhost:8631")
        );
        assert_eq!(cups_uri_from_server("/run/cups/cups.sock"), None);
    }
}
