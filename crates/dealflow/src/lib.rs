//! Dealflow
//!
//! Client side of the email analysis dashboard: tracks a server-side
//! analysis run to completion, then holds, filters, sorts, pages and exports
//! the resulting company records.

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod record;
pub mod store;
pub mod table;
pub mod tracker;

pub use cancel::CancellationToken;
pub use client::{
    AnalysisApi, ClientConfig, HttpAnalysisClient, JobSnapshot, RunHandle, RunId, StartOptions,
};
pub use config::{ConfigError, ConfigOverrides, DashboardConfig};
pub use error::{DashboardError, ErrorKind, Operation};
pub use export::ExportError;
pub use record::Record;
pub use store::{LoadOutcome, RecordStore, StoreSnapshot};
pub use table::{SortDirection, SortKey, TableEngine, TablePage, ViewState};
pub use tracker::{JobRun, JobTracker, PollPolicy, RunState, StartOutcome};
