// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where printgate keeps its config file and origin allowlist.

use std::path::PathBuf;

use tracing::warn;

/// Overrides the whole directory. Mostly useful for tests and containers.
pub const DATA_DIR_ENV: &str = "PRINTGATE_DATA_DIR";

const CONFIG_FILE: &str = "config.json";
const ALLOWLIST_FILE: &str = "allowed_domains.txt";

/// Return the printgate config directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = match std::env::var_os(DATA_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => base_dir().join("printgate"),
    };
    if let Err(err) = std::fs::create_dir_all(&dir) {
        warn!(path = %dir.display(), error = %err, "Cannot create data directory");
    }
    dir
}

pub fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

pub fn allowlist_path() -> PathBuf {
    data_dir().join(ALLOWLIST_FILE)
}

fn base_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    std::env::temp_dir()
}
