//! Remote job client.
//!
//! [`AnalysisApi`] is the seam the tracker and store are written against;
//! [`HttpAnalysisClient`] implements it over reqwest. The client shapes
//! requests and classifies failures. It never retries.

use crate::error::{DashboardError, Operation, Result};
use crate::record::Record;
use chrono::{DateTime, Utc};
use dealflow_protocol::{
    routes, CheckAuthResponse, ErrorResponse, LastAnalysisDateResponse, LoginResponse,
    ProgressResponse, StartAnalysisRequest, StartupRecord,
};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Options for starting a run.
pub type StartOptions = StartAnalysisRequest;

/// Status snapshot returned by one progress poll.
pub type JobSnapshot = ProgressResponse;

/// Locally generated identity of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token for an accepted run. The server tracks a single run per session, so
/// the handle only carries local identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub run_id: RunId,
    pub accepted_at: DateTime<Utc>,
}

impl RunHandle {
    pub fn new() -> Self {
        Self {
            run_id: RunId::new(),
            accepted_at: Utc::now(),
        }
    }
}

impl Default for RunHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Operations against the analysis server used by the tracker and store.
#[allow(async_fn_in_trait)]
pub trait AnalysisApi {
    async fn start(&self, options: StartOptions) -> Result<RunHandle>;

    async fn poll(&self, handle: &RunHandle) -> Result<JobSnapshot>;

    async fn fetch_records(&self) -> Result<Vec<Record>>;

    /// Fails with `NotFound` when the server has no record by that name.
    async fn delete_record(&self, name: &str) -> Result<()>;
}

impl<T: AnalysisApi + ?Sized> AnalysisApi for &T {
    async fn start(&self, options: StartOptions) -> Result<RunHandle> {
        (**self).start(options).await
    }

    async fn poll(&self, handle: &RunHandle) -> Result<JobSnapshot> {
        (**self).poll(handle).await
    }

    async fn fetch_records(&self) -> Result<Vec<Record>> {
        (**self).fetch_records().await
    }

    async fn delete_record(&self, name: &str) -> Result<()> {
        (**self).delete_record(name).await
    }
}

/// Connection settings for [`HttpAnalysisClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub session_cookie: Option<String>,
}

/// reqwest implementation of [`AnalysisApi`] plus the session endpoints.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpAnalysisClient {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = config.session_cookie.as_deref().filter(|c| !c.is_empty()) {
            let mut value = HeaderValue::from_str(cookie)
                .map_err(|e| anyhow::anyhow!("Session cookie is not a valid header value: {}", e))?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether the server considers the current session logged in.
    pub async fn check_auth(&self) -> Result<bool> {
        let op = Operation::CheckAuth;
        let response = self
            .send(op, self.http.get(self.endpoint(&[route(routes::CHECK_AUTH)])))
            .await?;
        let body: CheckAuthResponse = decode(op, response).await?;
        Ok(body.is_authenticated)
    }

    /// Authorization URL to open in a browser to establish a session.
    pub async fn login_url(&self) -> Result<String> {
        let op = Operation::Login;
        let response = self
            .send(op, self.http.get(self.endpoint(&[route(routes::LOGIN)])))
            .await?;
        let body: LoginResponse = decode(op, response).await?;
        Ok(body.authorization_url)
    }

    /// Status of the session's current (or most recent) run.
    pub async fn check_progress(&self) -> Result<JobSnapshot> {
        let op = Operation::CheckProgress;
        let response = self
            .send(
                op,
                self.http.get(self.endpoint(&[route(routes::CHECK_PROGRESS)])),
            )
            .await?;
        decode(op, response).await
    }

    /// When the last analysis finished, or `None` if there has not been one.
    pub async fn last_analysis_date(&self) -> Result<Option<DateTime<Utc>>> {
        let op = Operation::LastAnalysisDate;
        let response = self
            .send(
                op,
                self.http
                    .get(self.endpoint(&[route(routes::LAST_ANALYSIS_DATE)])),
            )
            .await?;
        let body: LastAnalysisDateResponse = decode(op, response).await?;
        Ok(body.last_analysis_date)
    }

    /// Join path segments onto the base URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, op: Operation, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| request_error(op, e))?;
        let status = response.status();
        debug!(operation = %op, status = status.as_u16(), "Analysis server responded");
        if status.is_success() {
            return Ok(response);
        }
        Err(status_error(op, status, response).await)
    }
}

impl AnalysisApi for HttpAnalysisClient {
    async fn start(&self, options: StartOptions) -> Result<RunHandle> {
        let op = Operation::StartAnalysis;
        self.send(
            op,
            self.http
                .post(self.endpoint(&[route(routes::START_ANALYSIS)]))
                .json(&options),
        )
        .await?;
        Ok(RunHandle::new())
    }

    async fn poll(&self, _handle: &RunHandle) -> Result<JobSnapshot> {
        self.check_progress().await
    }

    async fn fetch_records(&self) -> Result<Vec<Record>> {
        let op = Operation::FetchRecords;
        let response = self
            .send(op, self.http.get(self.endpoint(&[route(routes::STARTUPS)])))
            .await?;
        let rows: Vec<StartupRecord> = decode(op, response).await?;
        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn delete_record(&self, name: &str) -> Result<()> {
        let op = Operation::DeleteRecord;
        if is_dot_segment(name) {
            return Err(DashboardError::validation(
                op,
                format!("'{}' cannot be addressed as a URL path segment", name),
            )
            .with_record(name));
        }
        let url = self.endpoint(&[route(routes::STARTUPS), name]);
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| request_error(op, e).with_record(name))?;

        let status = response.status();
        debug!(operation = %op, record = name, status = status.as_u16(), "Analysis server responded");
        if status == StatusCode::NOT_FOUND {
            return Err(DashboardError::not_found(op, name));
        }
        if !status.is_success() {
            return Err(status_error(op, status, response).await.with_record(name));
        }
        Ok(())
    }
}

/// `.` and `..` are resolved away by URL normalization even when written as
/// `%2E`, so a record with such a name would address its parent collection.
fn is_dot_segment(name: &str) -> bool {
    matches!(name, "." | "..")
}

fn route(path: &'static str) -> &'static str {
    path.trim_start_matches('/')
}

fn request_error(op: Operation, err: reqwest::Error) -> DashboardError {
    if err.is_builder() {
        DashboardError::validation(op, err.to_string())
    } else if err.is_timeout() {
        DashboardError::transport(op, format!("request timed out: {}", err))
    } else {
        DashboardError::transport(op, err.to_string())
    }
}

async fn status_error(op: Operation, status: StatusCode, response: Response) -> DashboardError {
    let body = response.text().await.unwrap_or_default();
    DashboardError::server(op, status.as_u16(), error_message(status, &body))
}

/// Prefer the server's `{ error, details }` body, then the raw text, then the
/// status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        return parsed.message();
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
    }
    let mut message: String = trimmed.chars().take(200).collect();
    if trimmed.chars().count() > 200 {
        message.push_str("...");
    }
    message
}

async fn decode<T: DeserializeOwned>(op: Operation, response: Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(|e| request_error(op, e))?;
    serde_json::from_slice(&bytes).map_err(|e| DashboardError::decode(op, e.to_string()))
}
