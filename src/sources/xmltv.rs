//! Streaming XMLTV parser
//!
//! Reads `<channel>` and `<programme>` elements with the quick-xml event
//! reader and ignores everything else. Only the first `display-name` and the
//! first `title` of an element are kept; providers often repeat them per
//! language.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesRef, BytesStart, Event};
use tracing::trace;

use super::{ProgramFields, decode_utf8};
use crate::errors::{ParseError, ParseResult};
use crate::models::{Channel, PartialDocument, Rejection};

#[derive(Debug, Default)]
struct ChannelDraft {
    id: Option<String>,
    display_name: Option<String>,
    icon: Option<String>,
}

impl ChannelDraft {
    fn into_channel(self) -> Result<Channel, Rejection> {
        let id = self.id.map(|id| id.trim().to_string()).unwrap_or_default();
        if id.is_empty() {
            return Err(Rejection::channel(match self.display_name {
                Some(name) => format!("missing required attribute 'id' (display-name '{name}')"),
                None => "missing required attribute 'id'".to_string(),
            }));
        }
        Ok(Channel {
            id,
            display_name: self.display_name.unwrap_or_default(),
            icon: self.icon,
        })
    }
}

/// Element currently being read
#[derive(Debug)]
enum Draft {
    Channel(ChannelDraft),
    Programme(ProgramFields),
}

/// Child element whose text is being collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    DisplayName,
    Title,
    Desc,
    Category,
}

impl Field {
    fn for_child(draft: &Draft, name: &[u8]) -> Option<Self> {
        match (draft, name) {
            (Draft::Channel(_), b"display-name") => Some(Self::DisplayName),
            (Draft::Programme(_), b"title") => Some(Self::Title),
            (Draft::Programme(_), b"desc") => Some(Self::Desc),
            (Draft::Programme(_), b"category") => Some(Self::Category),
            _ => None,
        }
    }

    fn tag(&self) -> &'static [u8] {
        match self {
            Self::DisplayName => b"display-name",
            Self::Title => b"title",
            Self::Desc => b"desc",
            Self::Category => b"category",
        }
    }
}

/// Parse an XMLTV payload
pub fn parse_xmltv(data: &[u8]) -> ParseResult<PartialDocument> {
    let content = decode_utf8(data)?;
    let mut reader = Reader::from_str(content);
    // Entity references arrive as separate events; text is trimmed once the
    // element closes instead.
    reader.config_mut().trim_text(false);

    let mut document = PartialDocument::default();
    let mut draft: Option<Draft> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| ParseError::Xml {
            position: reader.error_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(ref e) => {
                let name = e.name();
                let name = name.as_ref();
                if let Some(current) = draft.as_mut() {
                    if field.is_none() {
                        field = Field::for_child(current, name);
                        text.clear();
                    }
                    // <icon> written with an explicit end tag
                    if name == b"icon" {
                        set_icon(current, e);
                    }
                } else if name == b"channel" {
                    draft = Some(Draft::Channel(channel_draft(e)));
                } else if name == b"programme" {
                    draft = Some(Draft::Programme(programme_fields(e)));
                }
            }

            Event::Empty(ref e) => match (&mut draft, e.name().as_ref()) {
                (None, b"channel") => {
                    finish(&mut document, Draft::Channel(channel_draft(e)));
                }
                (None, b"programme") => {
                    finish(&mut document, Draft::Programme(programme_fields(e)));
                }
                (Some(current), b"icon") => set_icon(current, e),
                _ => {}
            },

            Event::End(ref e) => {
                let name = e.name();
                let name = name.as_ref();
                if let (Some(current), Some(active)) = (&mut draft, field)
                    && name == active.tag()
                {
                    commit_text(current, active, text.trim());
                    field = None;
                    text.clear();
                    continue;
                }
                let closes_draft = matches!(
                    (&draft, name),
                    (Some(Draft::Channel(_)), b"channel") | (Some(Draft::Programme(_)), b"programme")
                );
                if closes_draft && let Some(done) = draft.take() {
                    finish(&mut document, done);
                    field = None;
                    text.clear();
                }
            }

            Event::Text(e) => {
                if field.is_some() {
                    let raw = std::str::from_utf8(&e).map_err(ParseError::Encoding)?;
                    match unescape(raw) {
                        Ok(unescaped) => text.push_str(&unescaped),
                        Err(_) => text.push_str(raw),
                    }
                }
            }

            Event::CData(e) => {
                if field.is_some() {
                    text.push_str(std::str::from_utf8(&e).map_err(ParseError::Encoding)?);
                }
            }

            Event::GeneralRef(e) => {
                if field.is_some() {
                    push_entity(&mut text, &e);
                }
            }

            Event::Eof => break,

            _ => {} // declarations, comments, DOCTYPE, processing instructions
        }
    }

    trace!(
        "Parsed XMLTV payload: {} channels, {} programmes, {} rejected",
        document.channels.len(),
        document.programs.len(),
        document.rejected.len()
    );

    Ok(document)
}

fn finish(document: &mut PartialDocument, draft: Draft) {
    let result = match draft {
        Draft::Channel(channel) => channel.into_channel().map(|c| document.channels.push(c)),
        Draft::Programme(fields) => fields.into_program().map(|p| document.programs.push(p)),
    };
    if let Err(rejection) = result {
        document.rejected.push(rejection);
    }
}

fn commit_text(draft: &mut Draft, field: Field, value: &str) {
    if value.is_empty() {
        return;
    }
    let slot = match (draft, field) {
        (Draft::Channel(channel), Field::DisplayName) => &mut channel.display_name,
        (Draft::Programme(fields), Field::Title) => &mut fields.title,
        (Draft::Programme(fields), Field::Desc) => &mut fields.description,
        (Draft::Programme(fields), Field::Category) => &mut fields.category,
        _ => return,
    };
    if slot.is_none() {
        *slot = Some(value.to_string());
    }
}

fn set_icon(draft: &mut Draft, element: &BytesStart) {
    let slot = match draft {
        Draft::Channel(channel) => &mut channel.icon,
        Draft::Programme(fields) => &mut fields.icon,
    };
    if slot.is_none() {
        *slot = parse_attributes(element)
            .remove("src")
            .map(|src| src.trim().to_string())
            .filter(|src| !src.is_empty());
    }
}

fn channel_draft(element: &BytesStart) -> ChannelDraft {
    let mut attrs = parse_attributes(element);
    ChannelDraft {
        id: attrs.remove("id"),
        ..Default::default()
    }
}

fn programme_fields(element: &BytesStart) -> ProgramFields {
    let mut attrs = parse_attributes(element);
    ProgramFields {
        channel: attrs.remove("channel"),
        start: attrs.remove("start"),
        stop: attrs.remove("stop"),
        ..Default::default()
    }
}

fn push_entity(text: &mut String, entity: &BytesRef) {
    if let Ok(Some(ch)) = entity.resolve_char_ref() {
        text.push(ch);
        return;
    }
    if let Ok(name) = std::str::from_utf8(entity) {
        match resolve_predefined_entity(name) {
            Some(resolved) => text.push_str(resolved),
            None => {
                // Unknown entity, keep it verbatim
                text.push('&');
                text.push_str(name);
                text.push(';');
            }
        }
    }
}

/// Parse XML attributes into a HashMap, unescaping values
fn parse_attributes(element: &BytesStart) -> HashMap<String, String> {
    let mut attrs = HashMap::new();

    for attr in element.attributes().flatten() {
        if let (Ok(key), Ok(value)) = (
            std::str::from_utf8(attr.key.as_ref()),
            std::str::from_utf8(&attr.value),
        ) {
            let value = unescape(value).map(|v| v.into_owned()).unwrap_or_else(|_| value.to_string());
            attrs.insert(key.to_string(), value);
        }
    }
    attrs
}
