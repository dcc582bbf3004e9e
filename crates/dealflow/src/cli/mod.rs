//! CLI module for Dealflow
//!
//! Each subcommand builds its own current-thread runtime and talks to the
//! analysis server through [`dealflow::HttpAnalysisClient`].

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod records;
pub mod session;

use crate::cli::error::HelpfulError;
use dealflow::{ConfigOverrides, DashboardConfig, DashboardError, HttpAnalysisClient};

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub base_url: Option<String>,
    pub session_cookie: Option<String>,
}

/// Resolve configuration: file, then env/flags, then per-command overrides.
pub fn resolve_config(
    global: &GlobalArgs,
    page_size: Option<usize>,
) -> anyhow::Result<DashboardConfig> {
    let config = DashboardConfig::load()
        .map_err(|e| HelpfulError::invalid_config(&e))?
        .with_overrides(&ConfigOverrides {
            base_url: global.base_url.clone(),
            session_cookie: global.session_cookie.clone(),
            page_size,
        });
    config
        .validate()
        .map_err(|e| HelpfulError::invalid_config(&e))?;
    Ok(config)
}

pub fn build_client(config: &DashboardConfig) -> anyhow::Result<HttpAnalysisClient> {
    let client_config = config
        .client_config()
        .map_err(|e| HelpfulError::invalid_config(&e))?;
    HttpAnalysisClient::new(&client_config)
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Wrap a dashboard failure with suggestions for the CLI boundary.
pub fn helpful(config: &DashboardConfig) -> impl Fn(DashboardError) -> anyhow::Error + '_ {
    move |err| HelpfulError::from_dashboard(&err, &config.base_url).into()
}
