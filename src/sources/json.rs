//! JSON guide parser
//!
//! Expected shape:
//!
//! ```json
//! {
//!   "channels": [{"id": "ch1", "display-name": "News One"}],
//!   "programs": [{"channel": "ch1", "start": "20251013150000 +0000",
//!                 "stop": "20251013160000 +0000", "title": "News", "desc": "..."}]
//! }
//! ```
//!
//! Providers are loose with field names, so a channel id may also come from
//! `channel` or `guid`, a display name from `name` or `title`, programmes from
//! a `programmes` array and descriptions from `description`. Ids may be
//! numbers. A malformed element is rejected on its own; only a payload that is
//! not JSON (or not an object) fails the whole source.

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use super::{ProgramFields, decode_utf8};
use crate::errors::ParseResult;
use crate::models::{Channel, PartialDocument, Rejection};

#[derive(Debug, Deserialize)]
struct JsonGuide {
    #[serde(default)]
    channels: Vec<Value>,
    #[serde(default)]
    programs: Vec<Value>,
    #[serde(default)]
    programmes: Vec<Value>,
}

/// String, number or boolean; everything a provider might put in a text field
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    /// Above `i64::MAX`; must come before `Float` to stay exact
    Unsigned(u64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Integer(n) => n.to_string(),
            Self::Unsigned(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Trimmed, non-empty text of the first populated candidate
fn first_text(candidates: impl IntoIterator<Item = Option<Scalar>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|value| value.into_string().trim().to_string())
        .find(|value| !value.is_empty())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonChannel {
    id: Option<Scalar>,
    channel: Option<Scalar>,
    guid: Option<Scalar>,
    #[serde(rename = "display-name")]
    display_name: Option<Scalar>,
    name: Option<Scalar>,
    title: Option<Scalar>,
    icon: Option<Scalar>,
}

impl JsonChannel {
    fn into_channel(self) -> Result<Channel, Rejection> {
        let display_name = first_text([self.display_name, self.name, self.title]);
        let Some(id) = first_text([self.id, self.channel, self.guid]) else {
            return Err(Rejection::channel(match display_name {
                Some(name) => format!("missing required field 'id' (display-name '{name}')"),
                None => "missing required field 'id'".to_string(),
            }));
        };
        Ok(Channel {
            id,
            display_name: display_name.unwrap_or_default(),
            icon: first_text([self.icon]),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct JsonProgram {
    channel: Option<Scalar>,
    start: Option<Scalar>,
    stop: Option<Scalar>,
    title: Option<Scalar>,
    desc: Option<Scalar>,
    description: Option<Scalar>,
    category: Option<Scalar>,
    icon: Option<Scalar>,
}

impl From<JsonProgram> for ProgramFields {
    fn from(program: JsonProgram) -> Self {
        Self {
            channel: first_text([program.channel]),
            start: first_text([program.start]),
            stop: first_text([program.stop]),
            title: first_text([program.title]),
            description: first_text([program.desc, program.description]),
            category: first_text([program.category]),
            icon: first_text([program.icon]),
        }
    }
}

/// Channel reference of a programme element we could not decode, for the warning
fn channel_hint(value: &Value) -> Option<String> {
    match value.get("channel")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a JSON payload
pub fn parse_json(data: &[u8]) -> ParseResult<PartialDocument> {
    let content = decode_utf8(data)?;
    let guide: JsonGuide = serde_json::from_str(content)?;

    let mut document = PartialDocument::default();

    for value in guide.channels {
        let result = serde_json::from_value::<JsonChannel>(value)
            .map_err(|e| Rejection::channel(format!("malformed channel entry: {e}")))
            .and_then(JsonChannel::into_channel);
        match result {
            Ok(channel) => document.channels.push(channel),
            Err(rejection) => document.rejected.push(rejection),
        }
    }

    for value in guide.programs.into_iter().chain(guide.programmes) {
        let hint = channel_hint(&value);
        let result = serde_json::from_value::<JsonProgram>(value)
            .map_err(|e| Rejection::programme(hint.as_deref(), format!("malformed programme entry: {e}")))
            .and_then(|program| ProgramFields::from(program).into_program());
        match result {
            Ok(program) => document.programs.push(program),
            Err(rejection) => document.rejected.push(rejection),
        }
    }

    trace!(
        "Parsed JSON payload: {} channels, {} programmes, {} rejected",
        document.channels.len(),
        document.programs.len(),
        document.rejected.len()
    );

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParseError;
    use crate::utils::time::format_xmltv_timestamp;

    #[test]
    fn test_parse_documented_shape() {
        let json = r#"{
            "channels": [{"id": "ch1", "display-name": "News One"}],
            "programs": [{
                "channel": "ch1",
                "start": "20251013150000 +0000",
                "stop": "20251013160000 +0000",
                "title": "Evening News",
                "desc": "Headlines"
            }]
        }"#;
        let doc = parse_json(json.as_bytes()).unwrap();

        assert_eq!(doc.channels, vec![Channel::new("ch1", "News One")]);
        assert_eq!(doc.programs.len(), 1);
        let program = &doc.programs[0];
        assert_eq!(program.channel_id, "ch1");
        assert_eq!(program.title, "Evening News");
        assert_eq!(program.description, "Headlines");
        assert_eq!(format_xmltv_timestamp(&program.stop), "20251013160000 +0000");
        assert!(doc.rejected.is_empty());
    }

    #[test]
    fn test_missing_arrays_yield_empty_document() {
        let doc = parse_json(b"{}").unwrap();
        assert!(doc.is_empty());

        let doc = parse_json(br#"{"channels": [{"id": "only"}]}"#).unwrap();
        assert_eq!(doc.channels.len(), 1);
        assert!(doc.programs.is_empty());
    }

    #[test]
    fn test_aliases_and_numeric_ids() {
        let json = r#"{
            "channels": [
                {"guid": 42, "name": "Numbered"},
                {"channel": "alt", "title": "Alt Title", "icon": "http://img/alt.png"}
            ],
            "programmes": [{
                "channel": 42,
                "start": "20251013T150000 +0100",
                "stop": "20251013T160000 +0100",
                "title": "Show",
                "description": "From the long field",
                "category": "Drama"
            }]
        }"#;
        let doc = parse_json(json.as_bytes()).unwrap();

        assert_eq!(doc.channels[0], Channel::new("42", "Numbered"));
        assert_eq!(doc.channels[1].display_name, "Alt Title");
        assert_eq!(doc.channels[1].icon.as_deref(), Some("http://img/alt.png"));

        let program = &doc.programs[0];
        assert_eq!(program.channel_id, "42");
        assert_eq!(program.description, "From the long field");
        assert_eq!(program.category.as_deref(), Some("Drama"));
        assert_eq!(format_xmltv_timestamp(&program.start), "20251013150000 +0100");
    }

    #[test]
    fn test_large_unsigned_ids_stay_exact() {
        let json = r#"{
            "channels": [{"id": 12345678901234567891, "display-name": "Big"}],
            "programs": [{"channel": 12345678901234567891, "start": "20251013150000 +0000",
                          "stop": "20251013160000 +0000", "title": "Show"}]
        }"#;
        let doc = parse_json(json.as_bytes()).unwrap();

        assert_eq!(doc.channels[0].id, "12345678901234567891");
        assert_eq!(doc.programs[0].channel_id, "12345678901234567891");
    }

    #[test]
    fn test_bad_entries_are_rejected_individually() {
        let json = r#"{
            "channels": [{"display-name": "No id"}, {"id": "ok"}],
            "programs": [
                {"channel": "ok", "start": "2025-10-13T15:00:00Z", "stop": "20251013160000 +0000"},
                {"channel": "ok", "start": {"nested": true}, "stop": "20251013160000 +0000"},
                {"channel": "ok", "start": "20251013170000 +0000", "stop": "20251013180000 +0000", "title": "Kept"}
            ]
        }"#;
        let doc = parse_json(json.as_bytes()).unwrap();

        assert_eq!(doc.channels.len(), 1);
        assert_eq!(doc.programs.len(), 1);
        assert_eq!(doc.programs[0].title, "Kept");
        assert_eq!(doc.rejected.len(), 3);
        assert!(doc.rejected[0].reason.contains("No id"));
        assert_eq!(doc.rejected[1].channel_id.as_deref(), Some("ok"));
        assert!(doc.rejected[2].reason.contains("malformed programme"));
    }

    #[test]
    fn test_invalid_json_reports_line_and_column() {
        let err = parse_json(b"{\n  \"channels\": [,]\n}").unwrap_err();
        match err {
            ParseError::Json { line, column, .. } => {
                assert_eq!(line, 2);
                assert!(column > 0);
            }
            other => panic!("expected JSON error, got {other:?}"),
        }
    }
}
