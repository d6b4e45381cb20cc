//! Non-fatal problems collected during a run

use chrono::{DateTime, FixedOffset};
use std::fmt;

use super::Program;
use crate::utils::time::format_xmltv_timestamp;

/// An element a parser had to drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// XMLTV element kind: `channel` or `programme`
    pub element: &'static str,
    /// Channel the element belonged to, when known
    pub channel_id: Option<String>,
    pub reason: String,
}

impl Rejection {
    pub fn channel<R: Into<String>>(reason: R) -> Self {
        Self {
            element: "channel",
            channel_id: None,
            reason: reason.into(),
        }
    }

    pub fn programme<R: Into<String>>(channel_id: Option<&str>, reason: R) -> Self {
        Self {
            element: "programme",
            channel_id: channel_id.filter(|id| !id.is_empty()).map(str::to_string),
            reason: reason.into(),
        }
    }
}

/// Enough of a programme to identify it in a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramRef {
    pub source: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub stop: DateTime<FixedOffset>,
}

impl ProgramRef {
    pub fn new(source: &str, program: &Program) -> Self {
        Self {
            source: source.to_string(),
            title: program.title.clone(),
            start: program.start,
            stop: program.stop,
        }
    }
}

impl fmt::Display for ProgramRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' [{} - {}] from '{}'",
            self.title,
            format_xmltv_timestamp(&self.start),
            format_xmltv_timestamp(&self.stop),
            self.source
        )
    }
}

/// Something that was dropped but did not stop the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// The parser could not use an element
    Rejected { source: String, rejection: Rejection },
    /// Programme references a channel no processed source declared
    UnknownChannel {
        source: String,
        channel_id: String,
        title: String,
    },
    /// Programme collides with one scheduled earlier
    MergeConflict {
        channel_id: String,
        kept: ProgramRef,
        dropped: ProgramRef,
    },
}

impl ValidationWarning {
    pub fn source(&self) -> &str {
        match self {
            Self::Rejected { source, .. } | Self::UnknownChannel { source, .. } => source,
            Self::MergeConflict { dropped, .. } => &dropped.source,
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { source, rejection } => match &rejection.channel_id {
                Some(channel_id) => write!(
                    f,
                    "[{source}] dropped <{}> on channel '{channel_id}': {}",
                    rejection.element, rejection.reason
                ),
                None => write!(f, "[{source}] dropped <{}>: {}", rejection.element, rejection.reason),
            },
            Self::UnknownChannel {
                source,
                channel_id,
                title,
            } => write!(
                f,
                "[{source}] dropped programme '{title}': unknown channel '{channel_id}'"
            ),
            Self::MergeConflict {
                channel_id,
                kept,
                dropped,
            } => write!(
                f,
                "[{}] merge conflict on channel '{channel_id}': dropped {dropped}, kept {kept}",
                dropped.source
            ),
        }
    }
}
