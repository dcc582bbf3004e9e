//! Tagged errors for dashboard operations.
//!
//! Every failure carries a [`ErrorKind`] callers can branch on, a message, and
//! the operation (plus record identity, when there is one) it came from.

use std::fmt;
use thiserror::Error;

/// Remote operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    StartAnalysis,
    CheckProgress,
    FetchRecords,
    DeleteRecord,
    CheckAuth,
    Login,
    LastAnalysisDate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::StartAnalysis => "start analysis",
            Operation::CheckProgress => "check progress",
            Operation::FetchRecords => "fetch records",
            Operation::DeleteRecord => "delete record",
            Operation::CheckAuth => "check auth",
            Operation::Login => "login",
            Operation::LastAnalysisDate => "last analysis date",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response reached us (connect failure, timeout, reset)
    Transport,
    /// Non-2xx response
    Server { status: u16 },
    /// The server has no record with the requested identity
    NotFound,
    /// Response body did not match the expected shape
    Decode,
    /// Rejected locally before any network call
    Validation,
    /// The exchange succeeded but the server reported the job itself failed
    JobFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transport => f.write_str("transport error"),
            ErrorKind::Server { status } => write!(f, "server error {}", status),
            ErrorKind::NotFound => f.write_str("not found"),
            ErrorKind::Decode => f.write_str("decode error"),
            ErrorKind::Validation => f.write_str("validation error"),
            ErrorKind::JobFailed => f.write_str("job failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub operation: Operation,
    pub record: Option<String>,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record {
            Some(name) => write!(f, "{} '{}'", self.operation, name),
            None => write!(f, "{}", self.operation),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{context} failed ({kind}): {message}")]
pub struct DashboardError {
    pub kind: ErrorKind,
    pub message: String,
    pub context: ErrorContext,
}

pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    pub fn new(kind: ErrorKind, operation: Operation, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: ErrorContext {
                operation,
                record: None,
            },
        }
    }

    pub fn transport(operation: Operation, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, operation, message)
    }

    pub fn server(operation: Operation, status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server { status }, operation, message)
    }

    pub fn not_found(operation: Operation, name: &str) -> Self {
        Self::new(
            ErrorKind::NotFound,
            operation,
            format!("no record named '{}' on the server", name),
        )
        .with_record(name)
    }

    pub fn decode(operation: Operation, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, operation, message)
    }

    pub fn validation(operation: Operation, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, operation, message)
    }

    pub fn job_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::JobFailed, Operation::CheckProgress, message)
    }

    /// Attach the identity of the record the operation targeted.
    pub fn with_record(mut self, name: impl Into<String>) -> Self {
        self.context.record = Some(name.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn operation(&self) -> Operation {
        self.context.operation
    }

    /// Transport failures are worth retrying; everything else is final for
    /// the operation that produced it.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport)
    }

    /// Message suitable for showing to the person at the dashboard.
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::Transport => format!(
                "Could not reach the analysis server ({}): {}",
                self.context, self.message
            ),
            ErrorKind::Server { status: 401 } => format!(
                "The session is not authenticated ({}). Log in and try again.",
                self.context
            ),
            ErrorKind::Server { status } => format!(
                "The analysis server rejected {} with status {}: {}",
                self.context, status, self.message
            ),
            ErrorKind::NotFound => match &self.context.record {
                Some(name) => format!("'{}' no longer exists on the server", name),
                None => format!("{}: not found", self.context),
            },
            ErrorKind::Decode => format!(
                "Unexpected response from the analysis server ({}): {}",
                self.context, self.message
            ),
            ErrorKind::Validation => format!("Invalid request ({}): {}", self.context, self.message),
            ErrorKind::JobFailed => self.message.clone(),
        }
    }
}
