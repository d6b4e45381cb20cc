//! Source payload parsers
//!
//! A source declares (or we sniff) one of a small, fixed set of formats.
//! Each format turns raw bytes into a [`PartialDocument`]; problems with a
//! single element become [`Rejection`](crate::models::Rejection)s inside the
//! document, while a payload that cannot be read at all is a [`ParseError`].

use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ParseError, ParseResult};
use crate::models::{PartialDocument, Program, Rejection};
use crate::utils::time::parse_xmltv_timestamp;

pub mod json;
pub mod mapping;
pub mod xmltv;

pub use mapping::ChannelMappings;

/// Payload format of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// XMLTV document
    Xml,
    /// `{"channels": [...], "programs": [...]}` document
    Json,
}

impl SourceFormat {
    /// Guess the format from the first meaningful byte
    pub fn detect(data: &[u8]) -> Option<Self> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        match data.iter().find(|b| !b.is_ascii_whitespace())? {
            b'<' => Some(Self::Xml),
            b'{' | b'[' => Some(Self::Json),
            _ => None,
        }
    }

    /// Use the declared format, or sniff one when none was configured
    pub fn resolve(declared: Option<Self>, data: &[u8]) -> ParseResult<Self> {
        if let Some(format) = declared {
            return Ok(format);
        }
        Self::detect(data).ok_or_else(|| ParseError::UnknownFormat {
            prefix: String::from_utf8_lossy(&data[..data.len().min(16)]).into_owned(),
        })
    }

    /// Parse a payload in this format
    pub fn parse(&self, data: &[u8]) -> ParseResult<PartialDocument> {
        match self {
            Self::Xml => xmltv::parse_xmltv(data),
            Self::Json => json::parse_json(data),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" | "xmltv" => Ok(Self::Xml),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown source format '{other}', expected 'xml' or 'json'")),
        }
    }
}

impl<'de> Deserialize<'de> for SourceFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

pub(crate) const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode a payload as UTF-8, dropping a leading byte order mark
pub(crate) fn decode_utf8(data: &[u8]) -> ParseResult<&str> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    Ok(std::str::from_utf8(data)?)
}

/// Raw programme fields as read from any source format
#[derive(Debug, Clone, Default)]
pub(crate) struct ProgramFields {
    pub channel: Option<String>,
    pub start: Option<String>,
    pub stop: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub icon: Option<String>,
}

impl ProgramFields {
    /// Validate required fields and timestamps
    pub fn into_program(self) -> Result<Program, Rejection> {
        let channel = self.channel.as_deref().map(str::trim).unwrap_or_default();
        if channel.is_empty() {
            return Err(Rejection::programme(None, "missing required attribute 'channel'"));
        }
        let reject = |reason: String| Rejection::programme(Some(channel), reason);

        let start = match self.start.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => {
                parse_xmltv_timestamp(value).map_err(|e| reject(format!("start: {e}")))?
            }
            _ => return Err(reject("missing required attribute 'start'".to_string())),
        };
        let stop = match self.stop.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => {
                parse_xmltv_timestamp(value).map_err(|e| reject(format!("stop: {e}")))?
            }
            _ => return Err(reject("missing required attribute 'stop'".to_string())),
        };
        if stop < start {
            return Err(reject(format!(
                "stop '{}' is before start '{}'",
                self.stop.unwrap_or_default().trim(),
                self.start.unwrap_or_default().trim()
            )));
        }

        Ok(Program {
            channel_id: channel.to_string(),
            start,
            stop,
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            category: self.category.filter(|c| !c.is_empty()),
            icon: self.icon.filter(|i| !i.is_empty()),
        })
    }
}
