//! End-of-run summary

use std::path::PathBuf;

use super::ValidationWarning;

/// How far one source got through the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// Parsed and handed to the merger
    Parsed { channels: usize, programs: usize },
    FetchFailed { error: String },
    ParseFailed { error: String },
}

impl SourceStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    /// Display name, credentials masked
    pub name: String,
    pub status: SourceStatus,
}

/// Everything a run did, for logging and for callers
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub sources: Vec<SourceOutcome>,
    pub warnings: Vec<ValidationWarning>,
    pub channels_written: usize,
    pub programs_written: usize,
    /// Where output went; `None` when nothing was written
    pub output_path: Option<PathBuf>,
    /// Output already held the same bytes
    pub unchanged: bool,
}

impl RunReport {
    pub fn succeeded_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.status.is_success()).count()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.len() - self.succeeded_sources()
    }
}
