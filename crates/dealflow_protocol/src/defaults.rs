//! Canonical default values shared by the client, tracker and CLI.

pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Delay between consecutive status polls while a run is in progress.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
/// Delay before re-polling after a transport failure.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 5_000;
/// Consecutive transport failures tolerated before a run is marked failed.
pub const DEFAULT_MAX_TRANSIENT_RETRIES: u32 = 60;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const EXPORT_FILE_NAME: &str = "startups_data.csv";
