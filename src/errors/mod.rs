//! Centralized error handling for the EPG grabber
//!
//! Errors are split by the stage that raises them so the orchestrator can
//! decide what is fatal for a single source and what is fatal for the run.
//!
//! # Error Categories
//!
//! - **Fetch Errors**: retrieving raw bytes for one source (timeouts, HTTP status, I/O)
//! - **Parse Errors**: malformed XMLTV or JSON payloads for one source
//! - **Serialization Errors**: internal consistency failures while emitting XMLTV
//! - **Configuration Errors**: unreadable or invalid configuration
//!
//! Per-programme problems (bad timestamps, unknown channels, overlaps) are not
//! errors at all; they are collected as
//! [`ValidationWarning`](crate::models::ValidationWarning)s.
//!
//! # Usage
//!
//! ```rust
//! use epg_grabber::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::configuration("no sources configured"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for fetch Results
pub type FetchResult<T> = Result<T, FetchError>;

/// Convenience type alias for parse Results
pub type ParseResult<T> = Result<T, ParseError>;
