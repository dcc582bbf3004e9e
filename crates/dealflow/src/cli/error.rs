//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use dealflow::{ConfigError, DashboardError, ErrorKind, ExportError};
use std::fmt;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions
            .extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Map a dashboard failure to advice for the person at the terminal.
    pub fn from_dashboard(err: &DashboardError, base_url: &str) -> Self {
        let base = Self::new(err.user_message()).with_context(err.to_string());
        match err.kind() {
            ErrorKind::Transport => base.with_suggestions([
                format!("TRY: Check that the analysis server is running at {}", base_url),
                "TRY: Point at another server with --base-url or DEALFLOW_BASE_URL".to_string(),
            ]),
            ErrorKind::Server { status: 401 } | ErrorKind::Server { status: 403 } => base
                .with_suggestions([
                    "TRY: dealflow login   # Open the printed URL to sign in".to_string(),
                    "TRY: Pass the session with --session-cookie or DEALFLOW_SESSION_COOKIE"
                        .to_string(),
                ]),
            ErrorKind::Server { .. } => {
                base.with_suggestion("TRY: Check the analysis server's logs for details")
            }
            ErrorKind::NotFound => base.with_suggestion(
                "TRY: dealflow list   # The record may already have been deleted",
            ),
            ErrorKind::Decode => base.with_suggestion(
                "TRY: Verify the server and this client speak the same API version",
            ),
            ErrorKind::Validation => base,
            ErrorKind::JobFailed => base.with_suggestions([
                "TRY: dealflow analyze   # Start a new run".to_string(),
                "TRY: dealflow analyze --full   # Re-analyze all emails".to_string(),
            ]),
        }
    }

    pub fn invalid_config(err: &ConfigError) -> Self {
        Self::new(format!("Invalid configuration: {}", err))
            .with_context(format!(
                "Configuration is read from {}",
                dealflow_protocol::paths::default_config_path().display()
            ))
            .with_suggestions([
                "TRY: dealflow config   # Show the resolved configuration".to_string(),
                "TRY: Fix or delete the config file to restore defaults".to_string(),
            ])
    }

    pub fn export_failed(err: &ExportError) -> Self {
        Self::new(format!("Export failed: {}", err)).with_suggestions([
            "TRY: Check that the target directory is writable".to_string(),
            "TRY: Choose another location with --output".to_string(),
        ])
    }

    pub fn page_out_of_range(requested: usize, total_pages: usize) -> Self {
        Self::new(format!("Page {} does not exist", requested))
            .with_context(format!("Valid pages: 1..={}", total_pages))
            .with_suggestion(format!("TRY: dealflow list --page {}", total_pages))
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;
        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }
        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
