// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line flags, layered over config.json.

use std::path::PathBuf;

use clap::Parser;

use printgate_core::config::AppConfig;

use crate::allowlist::{is_valid_origin, normalize_origin};

#[derive(Debug, Parser)]
#[command(name = "printgate", version, about = "Local HTTP print gateway for browser applications")]
pub struct Cli {
    /// Port to listen on.
    #[arg(long)]
    pub port: Option<u16>,

    /// Accept connections from the local network, not just this machine.
    #[arg(long)]
    pub enable_external_access: bool,

    /// Allow a web origin without approval, e.g. https://shop.example.com
    #[arg(long = "allow", value_name = "ORIGIN", value_parser = parse_origin)]
    pub allowed_origins: Vec<String>,

    /// Config file to read instead of the one in the data directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.enable_external_access {
            config.enable_external_access = true;
        }
        for origin in &self.allowed_origins {
            if !config.allowed_origins.contains(origin) {
                config.allowed_origins.push(origin.clone());
            }
        }
    }
}

fn parse_origin(value: &str) -> Result<String, String> {
    let origin = normalize_origin(value);
    if is_valid_origin(&origin) {
        Ok(origin)
    } else {
        Err(format!("'{value}' is not an origin like https://example.com"))
    }
}
