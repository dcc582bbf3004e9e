//! Dealflow Protocol
//!
//! Wire types for the email analysis server's HTTP contract, plus the
//! canonical defaults and filesystem locations shared by the client and CLI.

pub mod defaults;
pub mod error;
pub mod http_types;
pub mod paths;

pub use error::ProtocolError;

// Re-export HTTP API types
pub use http_types::{
    parse_lenient_date, parse_lenient_timestamp, routes, AnalysisStatus, CheckAuthResponse,
    ErrorResponse, LastAnalysisDateResponse, LoginResponse, ProgressResponse,
    StartAnalysisRequest, StartupRecord,
};
