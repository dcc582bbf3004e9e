//! `dealflow analyze`: start a run and track it to a terminal state.

use crate::cli::error::HelpfulError;
use crate::cli::output::print_record_page;
use crate::cli::{build_client, helpful, resolve_config, runtime, GlobalArgs};
use dealflow::{
    JobRun, JobTracker, RecordStore, RunState, StartOptions, StartOutcome, TableEngine, ViewState,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub full: bool,
    pub no_progress: bool,
}

pub fn run(global: &GlobalArgs, args: AnalyzeArgs) -> anyhow::Result<()> {
    let config = resolve_config(global, None)?;
    let rt = runtime()?;
    rt.block_on(run_async(&config, args))
}

async fn run_async(config: &dealflow::DashboardConfig, args: AnalyzeArgs) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let mut tracker = JobTracker::new(&client, config.poll_policy());

    let token = tracker.cancellation_token();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let mut updates = tracker.subscribe();
    let options = StartOptions {
        full_reanalysis: args.full,
    };
    let outcome = tracker.start(options).await.map_err(helpful(config))?;
    let run_id = match outcome {
        StartOutcome::Accepted(id) => id,
        StartOutcome::AlreadyActive | StartOutcome::Cancelled => {
            signal_task.abort();
            println!("{}", not_started_message(outcome));
            return Ok(());
        }
    };
    info!(run_id = %run_id, "Analysis accepted by server");

    let bar = progress_bar(args.no_progress);
    bar.set_message("starting");

    let final_run = {
        let track = tracker.run_until_terminal();
        tokio::pin!(track);
        loop {
            tokio::select! {
                run = &mut track => break run.clone(),
                changed = updates.changed() => {
                    if changed.is_err() {
                        break (&mut track).await.clone();
                    }
                    let run = updates.borrow_and_update().clone();
                    render(&bar, &run);
                }
            }
        }
    };
    signal_task.abort();
    render(&bar, &final_run);

    match final_run.state {
        RunState::Completed => {
            bar.finish_with_message("done");
            let found = final_run
                .result_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!(
                "Analysis complete: {} emails processed, {} startups found.",
                final_run.processed_count, found
            );
            show_first_page(&client, config).await
        }
        RunState::Error => {
            bar.abandon_with_message("failed");
            let err = final_run.error.unwrap_or_else(|| {
                dealflow::DashboardError::job_failed("Analysis failed with no details")
            });
            Err(HelpfulError::from_dashboard(&err, &config.base_url).into())
        }
        _ => {
            bar.abandon_with_message("stopped");
            println!(
                "Stopped tracking run {}. The analysis keeps running on the server; check it with `dealflow status`.",
                run_id
            );
            Ok(())
        }
    }
}

async fn show_first_page(
    client: &dealflow::HttpAnalysisClient,
    config: &dealflow::DashboardConfig,
) -> anyhow::Result<()> {
    let store = RecordStore::new(client);
    store.load().await.map_err(helpful(config))?;

    let snapshot = store.snapshot();
    let view = ViewState::new(config.table.page_size);
    let mut engine = TableEngine::new();
    let page = engine.page(&snapshot.records, snapshot.generation, &view);
    print_record_page(&page);
    Ok(())
}

/// What to tell the user when `start` did not hand back a run to track.
fn not_started_message(outcome: StartOutcome) -> &'static str {
    match outcome {
        StartOutcome::Cancelled => {
            "Cancelled while the start request was in flight. The server may still have \
             accepted it; check with `dealflow status`."
        }
        _ => "An analysis is already running; check it with `dealflow status`.",
    }
}

fn progress_bar(disabled: bool) -> ProgressBar {
    let bar = ProgressBar::new(0);
    if disabled || !std::io::stderr().is_terminal() {
        bar.set_draw_target(ProgressDrawTarget::hidden());
        return bar;
    }
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} emails {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn render(bar: &ProgressBar, run: &JobRun) {
    if run.total_count > 0 {
        bar.set_length(run.total_count);
        bar.set_position(run.processed_count);
    }
    let step = run.current_step.as_deref().unwrap_or(run.state.as_str());
    let message = if run.transient_failures > 0 {
        format!("| server unreachable, retrying ({})", run.transient_failures)
    } else if run.total_companies > 0 {
        format!(
            "| {} ({}/{} companies)",
            step, run.analyzed_companies, run.total_companies
        )
    } else {
        format!("| {}", step)
    };
    bar.set_message(message);
}
