//! Dealflow CLI
//!
//! Terminal front end for the email analysis dashboard: start and watch an
//! analysis run, browse and export the resulting records, check the session.

use clap::{Args, Parser, Subcommand};
use dealflow::SortKey;
use dealflow_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

use cli::analyze::AnalyzeArgs;
use cli::records::{ExportArgs, ListArgs, ViewArgs};
use cli::GlobalArgs;

#[derive(Parser, Debug)]
#[command(
    name = "dealflow",
    version,
    about = "Track email analysis runs and work with the discovered startups"
)]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Analysis server origin
    #[arg(long, global = true, env = "DEALFLOW_BASE_URL")]
    base_url: Option<String>,

    /// Session cookie sent with every request (e.g. "session=...")
    #[arg(long, global = true, env = "DEALFLOW_SESSION_COOKIE", hide_env_values = true)]
    session_cookie: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ViewOpts {
    /// Only include records with at least this many interactions
    #[arg(long)]
    min_interactions: Option<u32>,

    /// Column to sort by
    #[arg(long, value_enum, default_value_t = SortKey::Name)]
    sort: SortKey,

    /// Sort descending
    #[arg(long)]
    desc: bool,
}

impl From<ViewOpts> for ViewArgs {
    fn from(opts: ViewOpts) -> Self {
        Self {
            min_interactions: opts.min_interactions,
            sort: opts.sort,
            desc: opts.desc,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check whether the session is authenticated
    Auth,

    /// Print the authorization URL to open in a browser
    Login,

    /// Start an analysis run and track it until it finishes
    Analyze {
        /// Re-analyze all emails instead of only new ones
        #[arg(long)]
        full: bool,

        /// Do not draw a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Show the server's current analysis progress
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List analyzed records, one page at a time
    List {
        #[command(flatten)]
        view: ViewOpts,

        /// Page to show (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Rows per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one record by name
    Delete {
        /// Record name
        name: String,
    },

    /// Export the filtered, sorted records as CSV
    Export {
        #[command(flatten)]
        view: ViewOpts,

        /// Output file (default: <export_dir>/startups_data.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show when the last analysis finished
    LastAnalysis {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let progress_owns_terminal = matches!(
        cli.command,
        Commands::Analyze {
            no_progress: false,
            ..
        }
    );
    if let Err(err) = init_logging(LogConfig {
        app_name: "dealflow",
        verbose: cli.verbose,
        quiet_console: progress_owns_terminal || command_wants_json(&cli.command),
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Status { json }
        | Commands::List { json, .. }
        | Commands::LastAnalysis { json }
        | Commands::Config { json } => *json,
        _ => false,
    }
}

fn run_command(cli: Cli) -> anyhow::Result<()> {
    let global = GlobalArgs {
        base_url: cli.base_url,
        session_cookie: cli.session_cookie,
    };

    match cli.command {
        Commands::Auth => cli::session::auth(&global),
        Commands::Login => cli::session::login(&global),
        Commands::Analyze { full, no_progress } => {
            cli::analyze::run(&global, AnalyzeArgs { full, no_progress })
        }
        Commands::Status { json } => cli::session::status(&global, json),
        Commands::List {
            view,
            page,
            page_size,
            json,
        } => cli::records::list(
            &global,
            ListArgs {
                view: view.into(),
                page,
                page_size,
                json,
            },
        ),
        Commands::Delete { name } => cli::records::delete(&global, name),
        Commands::Export { view, output } => cli::records::export(
            &global,
            ExportArgs {
                view: view.into(),
                output,
            },
        ),
        Commands::LastAnalysis { json } => cli::session::last_analysis(&global, json),
        Commands::Config { json } => cli::config::run(&global, json),
    }
}
