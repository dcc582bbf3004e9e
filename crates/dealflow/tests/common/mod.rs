//! Shared test helpers: fixtures and a scripted in-memory `AnalysisApi`.

#![allow(dead_code)]

use chrono::NaiveDate;
use dealflow::error::Result;
use dealflow::{
    AnalysisApi, DashboardError, JobSnapshot, Operation, Record, RunHandle, StartOptions,
};
use dealflow_protocol::{AnalysisStatus, ProgressResponse};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;

// ============================================================================
// Fixtures
// ============================================================================

pub fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset as i64)
}

pub fn record(name: &str, interactions: u32) -> Record {
    Record::new(
        name,
        day(0),
        day(interactions),
        interactions,
        format!("founder@{}.io", name.to_lowercase().replace(' ', "-")),
        day(40),
    )
}

/// `count` records named "Company 01".."Company NN" with 1..=count interactions.
pub fn numbered_records(count: usize) -> Vec<Record> {
    (1..=count)
        .map(|i| record(&format!("Company {:02}", i), i as u32))
        .collect()
}

pub fn in_progress(processed: u64, total: u64) -> JobSnapshot {
    ProgressResponse::in_progress(processed, total)
}

pub fn completed(processed: u64, total: u64, startups: u64) -> JobSnapshot {
    JobSnapshot {
        status: AnalysisStatus::Completed,
        num_startups: Some(startups),
        ..ProgressResponse::in_progress(processed, total)
    }
}

pub fn failed(step: &str) -> JobSnapshot {
    JobSnapshot {
        status: AnalysisStatus::Error,
        current_step: Some(step.to_string()),
        ..ProgressResponse::in_progress(0, 0)
    }
}

pub fn transport_error(op: Operation) -> DashboardError {
    DashboardError::transport(op, "connection refused")
}

// ============================================================================
// Scripted AnalysisApi
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Start(bool),
    Poll,
    Fetch,
    Delete(String),
}

/// In-memory `AnalysisApi` that replays scripted results and records calls.
///
/// Queues are consumed front to back; when a queue runs dry the fallback
/// result is used (in-progress snapshot, empty record set, successful delete).
pub struct ScriptedApi {
    start_result: RefCell<Option<Result<RunHandle>>>,
    start_latency: Cell<Duration>,
    polls: RefCell<VecDeque<Result<JobSnapshot>>>,
    poll_fallback: RefCell<Result<JobSnapshot>>,
    poll_latency: Cell<Duration>,
    fetches: RefCell<VecDeque<(Duration, Result<Vec<Record>>)>>,
    deletes: RefCell<VecDeque<Result<()>>>,
    calls: RefCell<Vec<Call>>,
    poll_times: RefCell<Vec<Instant>>,
    in_flight_polls: Cell<usize>,
    max_in_flight_polls: Cell<usize>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            start_result: RefCell::new(None),
            start_latency: Cell::new(Duration::ZERO),
            polls: RefCell::new(VecDeque::new()),
            poll_fallback: RefCell::new(Ok(in_progress(0, 0))),
            poll_latency: Cell::new(Duration::ZERO),
            fetches: RefCell::new(VecDeque::new()),
            deletes: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
            poll_times: RefCell::new(Vec::new()),
            in_flight_polls: Cell::new(0),
            max_in_flight_polls: Cell::new(0),
        }
    }

    pub fn fail_start(&self, err: DashboardError) {
        *self.start_result.borrow_mut() = Some(Err(err));
    }

    /// The start request takes this long to resolve.
    pub fn set_start_latency(&self, latency: Duration) {
        self.start_latency.set(latency);
    }

    pub fn push_poll(&self, result: Result<JobSnapshot>) {
        self.polls.borrow_mut().push_back(result);
    }

    pub fn push_polls(&self, results: impl IntoIterator<Item = Result<JobSnapshot>>) {
        self.polls.borrow_mut().extend(results);
    }

    pub fn set_poll_fallback(&self, result: Result<JobSnapshot>) {
        *self.poll_fallback.borrow_mut() = result;
    }

    /// Every poll takes this long to resolve.
    pub fn set_poll_latency(&self, latency: Duration) {
        self.poll_latency.set(latency);
    }

    pub fn push_fetch(&self, result: Result<Vec<Record>>) {
        self.push_delayed_fetch(Duration::ZERO, result);
    }

    pub fn push_delayed_fetch(&self, delay: Duration, result: Result<Vec<Record>>) {
        self.fetches.borrow_mut().push_back((delay, result));
    }

    pub fn push_delete(&self, result: Result<()>) {
        self.deletes.borrow_mut().push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| matches(c)).count()
    }

    pub fn start_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Start(_)))
    }

    pub fn poll_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Poll))
    }

    /// Virtual-clock instants at which each poll was issued.
    pub fn poll_times(&self) -> Vec<Instant> {
        self.poll_times.borrow().clone()
    }

    pub fn max_in_flight_polls(&self) -> usize {
        self.max_in_flight_polls.get()
    }
}

impl AnalysisApi for ScriptedApi {
    async fn start(&self, options: StartOptions) -> Result<RunHandle> {
        self.calls
            .borrow_mut()
            .push(Call::Start(options.full_reanalysis));
        let latency = self.start_latency.get();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.start_result.borrow_mut().take() {
            Some(result) => result,
            None => Ok(RunHandle::new()),
        }
    }

    async fn poll(&self, _handle: &RunHandle) -> Result<JobSnapshot> {
        self.calls.borrow_mut().push(Call::Poll);
        self.poll_times.borrow_mut().push(Instant::now());

        let in_flight = self.in_flight_polls.get() + 1;
        self.in_flight_polls.set(in_flight);
        self.max_in_flight_polls
            .set(self.max_in_flight_polls.get().max(in_flight));

        let latency = self.poll_latency.get();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.in_flight_polls.set(self.in_flight_polls.get() - 1);

        let next = self.polls.borrow_mut().pop_front();
        next.unwrap_or_else(|| self.poll_fallback.borrow().clone())
    }

    async fn fetch_records(&self) -> Result<Vec<Record>> {
        self.calls.borrow_mut().push(Call::Fetch);
        let next = self.fetches.borrow_mut().pop_front();
        match next {
            Some((delay, result)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            None => Ok(Vec::new()),
        }
    }

    async fn delete_record(&self, name: &str) -> Result<()> {
        self.calls.borrow_mut().push(Call::Delete(name.to_string()));
        let next = self.deletes.borrow_mut().pop_front();
        next.unwrap_or(Ok(()))
    }
}

// ============================================================================
// Network
// ============================================================================

/// Address nothing is listening on.
pub async fn unused_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
