//! `dealflow auth`, `login`, `status` and `last-analysis`.

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_time_ago, print_key_values, state_color};
use crate::cli::{build_client, helpful, resolve_config, runtime, GlobalArgs};
use comfy_table::Color;
use dealflow::RunState;
use dealflow_protocol::AnalysisStatus;
use serde_json::json;

pub fn auth(global: &GlobalArgs) -> anyhow::Result<()> {
    let config = resolve_config(global, None)?;
    let authenticated = runtime()?.block_on(async {
        let client = build_client(&config)?;
        client.check_auth().await.map_err(helpful(&config))
    })?;

    if authenticated {
        println!("Session is authenticated with {}", config.base_url);
        Ok(())
    } else {
        Err(HelpfulError::new("Session is not authenticated")
            .with_context(format!("Server: {}", config.base_url))
            .with_suggestion("TRY: dealflow login   # Open the printed URL to sign in")
            .into())
    }
}

pub fn login(global: &GlobalArgs) -> anyhow::Result<()> {
    let config = resolve_config(global, None)?;
    let url = runtime()?.block_on(async {
        let client = build_client(&config)?;
        client.login_url().await.map_err(helpful(&config))
    })?;

    println!("Open this URL in a browser to authorize access to your mailbox:");
    println!();
    println!("  {}", url);
    Ok(())
}

pub fn status(global: &GlobalArgs, json: bool) -> anyhow::Result<()> {
    let config = resolve_config(global, None)?;
    let snapshot = runtime()?.block_on(async {
        let client = build_client(&config)?;
        client.check_progress().await.map_err(helpful(&config))
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let state = match snapshot.status {
        AnalysisStatus::InProgress => RunState::InProgress,
        AnalysisStatus::Completed => RunState::Completed,
        AnalysisStatus::Error => RunState::Error,
    };
    let mut rows = vec![
        (
            "Status",
            snapshot.status.to_string(),
            Some(state_color(state)),
        ),
        (
            "Emails",
            format!("{}/{}", snapshot.processed_emails, snapshot.total_emails),
            None,
        ),
        (
            "Companies",
            format!(
                "{}/{}",
                snapshot.analyzed_companies, snapshot.total_companies
            ),
            None,
        ),
    ];
    if let Some(found) = snapshot.num_startups {
        rows.push(("Startups found", found.to_string(), None));
    }
    if let Some(step) = &snapshot.current_step {
        let color = (snapshot.status == AnalysisStatus::Error).then_some(Color::Red);
        rows.push(("Current step", step.clone(), color));
    }
    print_key_values(rows);
    Ok(())
}

pub fn last_analysis(global: &GlobalArgs, json: bool) -> anyhow::Result<()> {
    let config = resolve_config(global, None)?;
    let last = runtime()?.block_on(async {
        let client = build_client(&config)?;
        client.last_analysis_date().await.map_err(helpful(&config))
    })?;

    if json {
        let value = json!({ "last_analysis_date": last.map(|t| t.to_rfc3339()) });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match last {
        Some(time) => println!(
            "Last analysis: {} ({})",
            time.format("%Y-%m-%d %H:%M:%S UTC"),
            format_time_ago(time)
        ),
        None => println!("No analysis has been run yet."),
    }
    Ok(())
}
