//! Channel id rename table
//!
//! Loaded from a TOML file of the form
//!
//! ```toml
//! [[mappings]]
//! original_id = "id1"
//! new_id = "id 1"
//! ```
//!
//! and applied to every parsed source before merging, so renamed channels
//! from different providers collapse into one.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::models::PartialDocument;

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    mappings: Vec<MappingEntry>,
}

#[derive(Debug, Deserialize)]
struct MappingEntry {
    original_id: String,
    new_id: String,
}

/// Exact-match `original_id -> new_id` table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMappings {
    mappings: HashMap<String, String>,
}

impl ChannelMappings {
    /// Load mappings from a TOML file. A missing file means no mappings.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Mapping file not found: {}. No mappings will be applied.",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        let mappings = Self::from_toml(&contents).map_err(|e| {
            AppError::configuration(format!("Invalid mapping file {}: {e}", path.display()))
        })?;
        info!("Loaded {} channel mappings from {}", mappings.len(), path.display());
        Ok(mappings)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        let file: MappingFile = toml::from_str(contents)?;
        Ok(file
            .mappings
            .into_iter()
            .map(|entry| (entry.original_id, entry.new_id))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Mapped id, or the id itself when no mapping exists
    pub fn map<'a>(&'a self, id: &'a str) -> &'a str {
        self.mappings.get(id).map(String::as_str).unwrap_or(id)
    }

    /// Rename channel ids and programme channel references in place
    pub fn apply(&self, document: &mut PartialDocument) {
        if self.is_empty() {
            return;
        }

        let mut renamed = 0usize;
        for channel in &mut document.channels {
            if let Some(new_id) = self.mappings.get(&channel.id) {
                channel.id = new_id.clone();
                renamed += 1;
            }
        }
        for program in &mut document.programs {
            if let Some(new_id) = self.mappings.get(&program.channel_id) {
                program.channel_id = new_id.clone();
            }
        }
        debug!("Renamed {} channels via mappings", renamed);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ChannelMappings {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            mappings: iter
                .into_iter()
                .map(|(original, new)| (original.into(), new.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, Program};
    use crate::utils::time::parse_xmltv_timestamp;
    use std::io::Write;
    use tracing_test::traced_test;

    fn program(channel_id: &str) -> Program {
        Program {
            channel_id: channel_id.to_string(),
            start: parse_xmltv_timestamp("20251013150000 +0000").unwrap(),
            stop: parse_xmltv_timestamp("20251013160000 +0000").unwrap(),
            title: "Show".to_string(),
            description: String::new(),
            category: None,
            icon: None,
        }
    }

    #[test]
    fn test_from_toml() {
        let mappings = ChannelMappings::from_toml(
            r#"
[[mappings]]
original_id = "id1"
new_id = "id 1"

[[mappings]]
original_id = "chA"
new_id = "Channel A"
"#,
        )
        .unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings.map("chA"), "Channel A");
        assert_eq!(mappings.map("other"), "other");
    }

    #[test]
    fn test_apply_renames_channels_and_programmes() {
        let mappings: ChannelMappings = [("id1", "id 1")].into_iter().collect();
        let mut document = PartialDocument {
            channels: vec![Channel::new("id1", "One"), Channel::new("id2", "Two")],
            programs: vec![program("id1"), program("id2")],
            rejected: Vec::new(),
        };

        mappings.apply(&mut document);

        assert_eq!(document.channels[0].id, "id 1");
        assert_eq!(document.channels[1].id, "id2");
        assert_eq!(document.programs[0].channel_id, "id 1");
        assert_eq!(document.programs[1].channel_id, "id2");
    }

    #[test]
    #[traced_test]
    fn test_missing_file_means_no_mappings() {
        let dir = tempfile::tempdir().unwrap();
        let mappings = ChannelMappings::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert!(mappings.is_empty());
        assert!(logs_contain("Mapping file not found"));
    }

    #[test]
    fn test_invalid_file_is_a_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[mappings]]\noriginal_id = 1").unwrap();
        let err = ChannelMappings::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));
    }
}
