//! Where Dealflow keeps its files on the local machine.
//!
//! Everything lives under one home directory: `config.toml` for the layered
//! configuration and `logs/` for the rotated log files. Setting
//! `DEALFLOW_HOME` moves all of it, which is how tests isolate themselves.

use std::path::PathBuf;

/// Resolve the Dealflow home directory.
///
/// Priority:
/// 1) DEALFLOW_HOME
/// 2) HOME/USERPROFILE
/// 3) ./.dealflow
pub fn dealflow_home() -> PathBuf {
    resolve_home(
        std::env::var("DEALFLOW_HOME").ok(),
        std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .ok(),
    )
}

fn resolve_home(override_path: Option<String>, user_home: Option<String>) -> PathBuf {
    match (override_path, user_home) {
        (Some(path), _) => PathBuf::from(path),
        (None, Some(home)) => PathBuf::from(home).join(".dealflow"),
        (None, None) => PathBuf::from(".").join(".dealflow"),
    }
}

/// Default config file: ~/.dealflow/config.toml
pub fn default_config_path() -> PathBuf {
    dealflow_home().join("config.toml")
}

/// Default logs directory: ~/.dealflow/logs
pub fn default_logs_dir() -> PathBuf {
    dealflow_home().join("logs")
}
