//! Job progress tracker.
//!
//! Owns the lifecycle of one analysis run: `Idle → Starting → InProgress →
//! {Completed, Error}`. Polling is a cooperative loop on the caller's task:
//! each poll is awaited and applied before the next one is scheduled, and the
//! wait between polls races the tracker's [`CancellationToken`].

use crate::cancel::CancellationToken;
use crate::client::{AnalysisApi, JobSnapshot, RunHandle, RunId, StartOptions};
use crate::error::{DashboardError, Result};
use chrono::{DateTime, Utc};
use dealflow_protocol::defaults::{
    DEFAULT_MAX_TRANSIENT_RETRIES, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RETRY_INTERVAL_MS,
};
use dealflow_protocol::AnalysisStatus;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RunState {
    Idle,
    Starting,
    InProgress,
    Completed,
    Error,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "Idle",
            RunState::Starting => "Starting",
            RunState::InProgress => "InProgress",
            RunState::Completed => "Completed",
            RunState::Error => "Error",
        }
    }

    /// A run is active from the start request until a terminal state.
    pub fn is_active(&self) -> bool {
        matches!(self, RunState::Starting | RunState::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Error)
    }

    /// Transitions only move forward; `Starting` is re-entered only by a new start.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        match (self, next) {
            (RunState::Idle | RunState::Completed | RunState::Error, RunState::Starting) => true,
            (RunState::Starting, RunState::InProgress | RunState::Error) => true,
            (RunState::InProgress, RunState::Completed | RunState::Error) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locally tracked state of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRun {
    pub id: Option<RunId>,
    pub state: RunState,
    pub started_at: Option<DateTime<Utc>>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub processed_count: u64,
    pub total_count: u64,
    pub analyzed_companies: u64,
    pub total_companies: u64,
    pub result_count: Option<u64>,
    pub current_step: Option<String>,
    pub error: Option<DashboardError>,
    /// Consecutive transport failures since the last successful poll.
    pub transient_failures: u32,
}

impl JobRun {
    pub fn idle() -> Self {
        Self {
            id: None,
            state: RunState::Idle,
            started_at: None,
            last_polled_at: None,
            processed_count: 0,
            total_count: 0,
            analyzed_companies: 0,
            total_companies: 0,
            result_count: None,
            current_step: None,
            error: None,
            transient_failures: 0,
        }
    }

    fn starting(id: RunId) -> Self {
        Self {
            id: Some(id),
            state: RunState::Starting,
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    /// Fraction of emails processed, in percent. `None` until the total is known.
    pub fn percentage(&self) -> Option<f64> {
        if self.total_count == 0 {
            return None;
        }
        Some(self.processed_count as f64 * 100.0 / self.total_count as f64)
    }
}

impl Default for JobRun {
    fn default() -> Self {
        Self::idle()
    }
}

/// Poll scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each regular poll.
    pub interval: Duration,
    /// Delay before re-polling after a transport failure.
    pub retry_interval: Duration,
    /// Consecutive transport failures tolerated before the run fails.
    pub max_transient_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            retry_interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            max_transient_retries: DEFAULT_MAX_TRANSIENT_RETRIES,
        }
    }
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The server accepted the run; polling is scheduled.
    Accepted(RunId),
    /// A run is already starting or in progress; nothing was sent.
    AlreadyActive,
    /// The tracker has been cancelled and accepts no more work.
    Cancelled,
}

pub struct JobTracker<C> {
    client: C,
    policy: PollPolicy,
    run: JobRun,
    handle: Option<RunHandle>,
    next_poll: Option<Duration>,
    cancel: CancellationToken,
    updates: watch::Sender<JobRun>,
}

impl<C: AnalysisApi> JobTracker<C> {
    pub fn new(client: C, policy: PollPolicy) -> Self {
        let (updates, _) = watch::channel(JobRun::idle());
        Self {
            client,
            policy,
            run: JobRun::idle(),
            handle: None,
            next_poll: None,
            cancel: CancellationToken::new(),
            updates,
        }
    }

    pub fn run(&self) -> &JobRun {
        &self.run
    }

    /// Delay until the next scheduled poll, if one is scheduled.
    pub fn next_poll(&self) -> Option<Duration> {
        self.next_poll
    }

    /// Receive every change to the run.
    pub fn subscribe(&self) -> watch::Receiver<JobRun> {
        self.updates.subscribe()
    }

    /// Token that cancels this tracker; hand it to a signal handler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Start a new run unless one is already active.
    ///
    /// On success the first poll is scheduled one interval out. On failure the
    /// run moves to `Error` and the cause is returned.
    pub async fn start(&mut self, options: StartOptions) -> Result<StartOutcome> {
        if self.cancel.is_cancelled() {
            return Ok(StartOutcome::Cancelled);
        }
        if self.run.state.is_active() {
            debug!(state = %self.run.state, "Ignoring start request; run already active");
            return Ok(StartOutcome::AlreadyActive);
        }

        let id = RunId::new();
        self.run = JobRun::starting(id);
        self.handle = None;
        self.next_poll = None;
        self.publish();
        info!(run_id = %id, full_reanalysis = options.full_reanalysis, "Starting analysis run");

        let cancel = self.cancel.clone();
        let result = tokio::select! {
            _ = cancel.cancelled() => None,
            result = self.client.start(options) => Some(result),
        };
        let Some(result) = result.filter(|_| !self.cancel.is_cancelled()) else {
            info!(run_id = %id, "Run cancelled while starting");
            return Ok(StartOutcome::Cancelled);
        };

        match result {
            Ok(handle) => {
                self.handle = Some(handle);
                self.transition(RunState::InProgress);
                self.next_poll = Some(self.policy.interval);
                self.publish();
                Ok(StartOutcome::Accepted(id))
            }
            Err(err) => {
                self.fail(err.clone());
                Err(err)
            }
        }
    }

    /// Issue one status poll and apply its result.
    ///
    /// Returns the delay until the next poll, or `None` once the run is
    /// terminal, cancelled, or was never started.
    pub async fn poll_once(&mut self) -> Option<Duration> {
        self.next_poll = None;
        if self.cancel.is_cancelled() || self.run.state != RunState::InProgress {
            return None;
        }
        let handle = self.handle.clone()?;

        let cancel = self.cancel.clone();
        let result = tokio::select! {
            _ = cancel.cancelled() => None,
            result = self.client.poll(&handle) => Some(result),
        };
        let result = result.filter(|_| !self.cancel.is_cancelled())?;

        self.run.last_polled_at = Some(Utc::now());
        self.next_poll = match result {
            Ok(snapshot) => self.apply_snapshot(snapshot),
            Err(err) if err.is_transient() => self.record_transient_failure(err),
            Err(err) => {
                self.fail(err);
                None
            }
        };
        self.publish();
        self.next_poll
    }

    /// Poll until the run reaches a terminal state or the tracker is cancelled.
    pub async fn run_until_terminal(&mut self) -> &JobRun {
        let cancel = self.cancel.clone();
        while let Some(delay) = self.next_poll {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(run_id = ?self.run.id, "Stopped tracking analysis run");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            self.poll_once().await;
        }
        &self.run
    }

    fn apply_snapshot(&mut self, snapshot: JobSnapshot) -> Option<Duration> {
        self.run.transient_failures = 0;

        let mut processed = snapshot.processed_emails;
        if snapshot.total_emails > 0 && processed > snapshot.total_emails {
            warn!(
                processed,
                total = snapshot.total_emails,
                "Server reported more processed emails than total; clamping"
            );
            processed = snapshot.total_emails;
        }
        self.run.processed_count = processed;
        self.run.total_count = snapshot.total_emails;
        self.run.analyzed_companies = snapshot.analyzed_companies;
        self.run.total_companies = snapshot.total_companies;
        if snapshot.num_startups.is_some() {
            self.run.result_count = snapshot.num_startups;
        }
        if snapshot.current_step.is_some() {
            self.run.current_step = snapshot.current_step.clone();
        }

        match snapshot.status {
            AnalysisStatus::Completed => {
                self.transition(RunState::Completed);
                None
            }
            AnalysisStatus::Error => {
                let detail = snapshot
                    .current_step
                    .unwrap_or_else(|| "no details reported".to_string());
                self.fail(DashboardError::job_failed(format!(
                    "Analysis failed: {}",
                    detail
                )));
                None
            }
            AnalysisStatus::InProgress => {
                debug!(
                    processed = self.run.processed_count,
                    total = self.run.total_count,
                    "Analysis in progress"
                );
                Some(self.policy.interval)
            }
        }
    }

    fn record_transient_failure(&mut self, err: DashboardError) -> Option<Duration> {
        self.run.transient_failures = self.run.transient_failures.saturating_add(1);
        if self.run.transient_failures > self.policy.max_transient_retries {
            error!(
                failures = self.run.transient_failures,
                "Giving up on analysis server after repeated transport failures"
            );
            self.fail(err);
            return None;
        }
        warn!(
            failures = self.run.transient_failures,
            retry_in_ms = self.policy.retry_interval.as_millis() as u64,
            error = %err,
            "Progress poll failed; retrying"
        );
        Some(self.policy.retry_interval)
    }

    fn fail(&mut self, err: DashboardError) {
        error!(run_id = ?self.run.id, error = %err, "Analysis run failed");
        self.run.error = Some(err);
        self.transition(RunState::Error);
        self.next_poll = None;
        self.publish();
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.run.state.can_transition_to(next),
            "invalid run transition {} -> {}",
            self.run.state,
            next
        );
        info!(run_id = ?self.run.id, from = %self.run.state, to = %next, "Run state changed");
        self.run.state = next;
    }

    fn publish(&self) {
        self.updates.send_replace(self.run.clone());
    }
}
