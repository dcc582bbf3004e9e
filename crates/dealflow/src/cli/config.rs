//! `dealflow config`: show the resolved configuration and file locations.

use crate::cli::output::print_key_values;
use crate::cli::{resolve_config, GlobalArgs};
use dealflow_logging::log_file_path;
use dealflow_protocol::paths::{dealflow_home, default_config_path};
use serde_json::json;

pub fn run(global: &GlobalArgs, json: bool) -> anyhow::Result<()> {
    let config = resolve_config(global, None)?.redacted();
    let config_path = default_config_path();

    if json {
        let value = json!({
            "config": config,
            "paths": {
                "home": dealflow_home(),
                "config_file": config_path,
                "config_file_exists": config_path.exists(),
                "log_file": log_file_path("dealflow"),
            },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let file_note = if config_path.exists() {
        config_path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", config_path.display())
    };
    print_key_values(vec![
        ("Base URL", config.base_url.clone(), None),
        (
            "Session cookie",
            config
                .session_cookie
                .clone()
                .unwrap_or_else(|| "(none)".to_string()),
            None,
        ),
        (
            "Request timeout",
            format!("{}s", config.request_timeout_secs),
            None,
        ),
        (
            "Poll interval",
            format!("{}ms", config.poll.interval_ms),
            None,
        ),
        (
            "Retry interval",
            format!("{}ms", config.poll.retry_interval_ms),
            None,
        ),
        (
            "Max transient retries",
            config.poll.max_transient_retries.to_string(),
            None,
        ),
        ("Page size", config.table.page_size.to_string(), None),
        (
            "Export directory",
            config.export_dir().display().to_string(),
            None,
        ),
        ("Config file", file_note, None),
        (
            "Log file",
            log_file_path("dealflow").display().to_string(),
            None,
        ),
    ]);
    Ok(())
}
