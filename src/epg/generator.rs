//! XMLTV emission
//!
//! Output layout is fixed: declaration, DOCTYPE, `<tv>`, every channel in
//! channel order, then every programme grouped by channel and sorted by
//! start. Two-space indentation and `\n` line endings, so the same document
//! always produces the same bytes.

use chrono::{DateTime, FixedOffset};
use tracing::debug;

use crate::errors::SerializationError;
use crate::models::{Channel, EpgDocument, Program};
use crate::utils::time::{format_xmltv_timestamp, normalize_to_utc};

pub const GENERATOR_NAME: &str = "epg-grabber";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Rewrite every timestamp with a `+0000` offset
    pub normalize_to_utc: bool,
}

/// Serializes an [`EpgDocument`] as XMLTV
#[derive(Debug, Clone, Default)]
pub struct XmltvGenerator {
    options: GeneratorOptions,
}

impl XmltvGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    /// Generate the XMLTV bytes for a merged document
    pub fn generate(&self, document: &EpgDocument) -> Result<Vec<u8>, SerializationError> {
        let mut xmltv = String::new();
        Self::push_header(&mut xmltv);

        for channel in document.channels() {
            self.push_channel(&mut xmltv, channel)?;
        }

        let mut programs = 0usize;
        for program in document.programs() {
            if program.channel_id.is_empty() {
                return Err(SerializationError::MissingAttribute {
                    element: "programme",
                    attribute: "channel",
                });
            }
            if !document.contains_channel(&program.channel_id) {
                return Err(SerializationError::UnknownChannel {
                    channel_id: program.channel_id.clone(),
                });
            }
            self.push_programme(&mut xmltv, program);
            programs += 1;
        }

        xmltv.push_str("</tv>\n");

        debug!(
            "Generated XMLTV: {} channels, {} programmes, {} bytes",
            document.channel_count(),
            programs,
            xmltv.len()
        );

        Ok(xmltv.into_bytes())
    }

    /// A valid XMLTV document with no channels
    pub fn generate_empty() -> Vec<u8> {
        let mut xmltv = String::new();
        Self::push_header(&mut xmltv);
        xmltv.push_str("</tv>\n");
        xmltv.into_bytes()
    }

    fn push_header(xmltv: &mut String) {
        xmltv.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xmltv.push_str("<!DOCTYPE tv SYSTEM \"xmltv.dtd\">\n");
        xmltv.push_str(&format!("<tv generator-info-name=\"{GENERATOR_NAME}\">\n"));
    }

    fn push_channel(&self, xmltv: &mut String, channel: &Channel) -> Result<(), SerializationError> {
        if channel.id.is_empty() {
            return Err(SerializationError::MissingAttribute {
                element: "channel",
                attribute: "id",
            });
        }

        xmltv.push_str(&format!("  <channel id=\"{}\">\n", escape_xml(&channel.id)));
        xmltv.push_str(&format!(
            "    <display-name>{}</display-name>\n",
            escape_xml(&channel.display_name)
        ));
        if let Some(icon) = channel.icon.as_deref().filter(|icon| !icon.is_empty()) {
            xmltv.push_str(&format!("    <icon src=\"{}\" />\n", escape_xml(icon)));
        }
        xmltv.push_str("  </channel>\n");
        Ok(())
    }

    fn push_programme(&self, xmltv: &mut String, program: &Program) {
        xmltv.push_str(&format!(
            "  <programme channel=\"{}\" start=\"{}\" stop=\"{}\">\n",
            escape_xml(&program.channel_id),
            self.timestamp(&program.start),
            self.timestamp(&program.stop)
        ));
        xmltv.push_str(&format!("    <title>{}</title>\n", escape_xml(&program.title)));
        if !program.description.is_empty() {
            xmltv.push_str(&format!("    <desc>{}</desc>\n", escape_xml(&program.description)));
        }
        if let Some(category) = program.category.as_deref().filter(|c| !c.is_empty()) {
            xmltv.push_str(&format!("    <category>{}</category>\n", escape_xml(category)));
        }
        if let Some(icon) = program.icon.as_deref().filter(|icon| !icon.is_empty()) {
            xmltv.push_str(&format!("    <icon src=\"{}\" />\n", escape_xml(icon)));
        }
        xmltv.push_str("  </programme>\n");
    }

    fn timestamp(&self, dt: &DateTime<FixedOffset>) -> String {
        if self.options.normalize_to_utc {
            format_xmltv_timestamp(&normalize_to_utc(dt))
        } else {
            format_xmltv_timestamp(dt)
        }
    }
}

/// Escape XML special characters and drop characters XML 1.0 cannot carry
pub fn escape_xml(input: &str) -> String {
    input
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
        .collect::<String>()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
