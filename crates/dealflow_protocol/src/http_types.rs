//! HTTP API types for the email analysis server.
//!
//! These mirror the JSON bodies exchanged with the analysis server (start,
//! progress, results, session). Field names follow the server's snake_case
//! wire names; decoding is lenient where the server is known to be loose
//! (nullable counters, HTTP-date formatted dates).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{ProtocolError, Result};

// ============================================================================
// Routes
// ============================================================================

/// Endpoint paths relative to the configured origin.
pub mod routes {
    pub const CHECK_AUTH: &str = "/check_auth";
    pub const LOGIN: &str = "/login";
    pub const START_ANALYSIS: &str = "/start_analysis";
    pub const CHECK_PROGRESS: &str = "/check_progress";
    pub const STARTUPS: &str = "/startups";
    pub const LAST_ANALYSIS_DATE: &str = "/last-analysis-date";
}

// ============================================================================
// Session Types
// ============================================================================

/// Response for GET /check_auth
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckAuthResponse {
    #[serde(default)]
    pub is_authenticated: bool,
}

/// Response for GET /login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    pub authorization_url: String,
}

// ============================================================================
// Analysis Types
// ============================================================================

/// Body for POST /start_analysis
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartAnalysisRequest {
    /// Re-analyze every mailbox message instead of only new ones
    #[serde(default)]
    pub full_reanalysis: bool,
}

/// Analysis status reported by GET /check_progress.
///
/// The server only promises "Completed" and "Error" as terminal values; any
/// other status string means the run is still going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnalysisStatus {
    InProgress,
    Completed,
    Error,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::InProgress => "InProgress",
            AnalysisStatus::Completed => "Completed",
            AnalysisStatus::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Error)
    }
}

impl From<String> for AnalysisStatus {
    fn from(value: String) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("completed") {
            AnalysisStatus::Completed
        } else if value.eq_ignore_ascii_case("error") {
            AnalysisStatus::Error
        } else {
            AnalysisStatus::InProgress
        }
    }
}

impl From<AnalysisStatus> for String {
    fn from(value: AnalysisStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response for GET /check_progress
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressResponse {
    pub status: AnalysisStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processed_emails: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_emails: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub analyzed_companies: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_companies: u64,
    /// Startups identified so far (present once the server has counted them)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_startups: Option<u64>,
    /// Human-readable phase, or the failure detail when status is Error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
}

impl ProgressResponse {
    pub fn in_progress(processed_emails: u64, total_emails: u64) -> Self {
        Self {
            status: AnalysisStatus::InProgress,
            processed_emails,
            total_emails,
            analyzed_companies: 0,
            total_companies: 0,
            num_startups: None,
            current_step: None,
        }
    }
}

/// One analyzed company as returned by GET /startups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartupRecord {
    pub name: String,
    #[serde(deserialize_with = "lenient_date")]
    pub first_interaction_date: NaiveDate,
    #[serde(deserialize_with = "lenient_date")]
    pub last_interaction_date: NaiveDate,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_interactions: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_contact: String,
    #[serde(deserialize_with = "lenient_date")]
    pub analysis_date: NaiveDate,
}

/// Response for GET /last-analysis-date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastAnalysisDateResponse {
    #[serde(default, deserialize_with = "lenient_optional_timestamp")]
    pub last_analysis_date: Option<DateTime<Utc>>,
}

// ============================================================================
// Error Response
// ============================================================================

/// Error body returned by the server on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Single-line message combining the error and its details.
    pub fn message(&self) -> String {
        match &self.details {
            Some(serde_json::Value::String(details)) if !details.is_empty() => {
                format!("{} ({})", self.error, details)
            }
            Some(serde_json::Value::Null) | None => self.error.clone(),
            Some(other) => format!("{} ({})", self.error, other),
        }
    }
}

// ============================================================================
// Lenient Decoding
// ============================================================================

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a date the way the analysis server emits it.
///
/// Accepts `YYYY-MM-DD`, RFC 3339, RFC 2822 / HTTP dates (Flask's default
/// date encoding) and naive datetimes; time components are dropped.
pub fn parse_lenient_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_lenient_timestamp(value)
        .map(|ts| ts.date_naive())
        .map_err(|_| ProtocolError::InvalidDate(value.to_string()))
}

/// Parse a timestamp; values without an offset are taken as UTC.
pub fn parse_lenient_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    Err(ProtocolError::InvalidTimestamp(value.to_string()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_lenient_date(&raw).map_err(serde::de::Error::custom)
}

fn lenient_optional_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_lenient_timestamp(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
