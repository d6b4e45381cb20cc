//! Error type definitions for the EPG grabber

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level application error type
///
/// Only errors that end a run surface as `AppError`; per-source failures are
/// recorded in the run report and the run carries on with the other sources.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Source fetching errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Source parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// XMLTV emission errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Filesystem errors with the path that caused them
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No source produced data and the previous output was kept
    #[error("No EPG source could be parsed ({failed} failed)")]
    NoUsableSources { failed: usize },
}

/// Errors raised while retrieving the raw bytes of one source
#[derive(Error, Debug)]
pub enum FetchError {
    /// Request did not complete in time
    #[error("Timed out after {}: {url}", humantime::format_duration(*timeout))]
    Timeout { url: String, timeout: Duration },

    /// Server answered with a non-success status
    #[error("HTTP error: {status} - {url}")]
    Http { status: u16, url: String },

    /// Connection, TLS or protocol failure
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// URL could not be understood
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Auth header configured through an environment variable that is not set
    #[error("Auth header environment variable '{variable}' is not set")]
    MissingSecret { variable: String },

    /// Local file source could not be read
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Payload looked compressed but could not be decompressed
    #[error("Failed to decompress {format} content: {message}")]
    Decompression { format: String, message: String },
}

/// Errors that make a whole source unusable
#[derive(Error, Debug)]
pub enum ParseError {
    /// Malformed XML
    #[error("Invalid XMLTV at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// Malformed JSON
    #[error("Invalid JSON at line {line}, column {column}: {message}")]
    Json {
        line: usize,
        column: usize,
        message: String,
    },

    /// Payload is not valid UTF-8
    #[error("Content is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Format could not be determined from the content
    #[error("Unable to detect source format (content starts with {prefix:?})")]
    UnknownFormat { prefix: String },

    /// A timestamp that does not follow `YYYYMMDDHHMMSS ±HHMM`
    #[error("Invalid timestamp '{value}': {reason}")]
    Timestamp { value: String, reason: String },
}

/// Internal consistency failures detected while emitting XMLTV
#[derive(Error, Debug)]
pub enum SerializationError {
    /// An attribute XMLTV requires is empty
    #[error("Missing required attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// A programme references a channel that is not in the document
    #[error("Programme references unknown channel '{channel_id}'")]
    UnknownChannel { channel_id: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a `std::io::Error` with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl FetchError {
    /// Create a transport error
    pub fn transport<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a decompression error
    pub fn decompression<F: Into<String>, M: Into<String>>(format: F, message: M) -> Self {
        Self::Decompression {
            format: format.into(),
            message: message.into(),
        }
    }
}

impl ParseError {
    /// Create a timestamp error
    pub fn timestamp<V: Into<String>, R: Into<String>>(value: V, reason: R) -> Self {
        Self::Timestamp {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}
