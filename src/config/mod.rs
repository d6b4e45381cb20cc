//! Run configuration
//!
//! Loaded from a TOML file; command line flags and their environment
//! variables override the output and mapping paths afterwards.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

use crate::errors::{AppError, AppResult, FetchError, FetchResult};
use crate::sources::SourceFormat;
use crate::utils::http_client::{AuthHeader, FetchRequest};
use crate::utils::url::UrlUtils;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Optional channel id rename table
    #[serde(default)]
    pub mapping_file: Option<PathBuf>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_normalize_to_utc")]
    pub normalize_to_utc: bool,
    #[serde(default)]
    pub on_empty: OnEmpty,
}

/// What to do when no source could be parsed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnEmpty {
    /// Leave the previous output untouched and fail the run
    #[default]
    KeepExisting,
    /// Write a valid empty guide and succeed
    WriteEmpty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout", deserialize_with = "duration_serde::deserialize")]
    pub timeout: Duration,
    /// Fetch all sources at once rather than one after another
    #[serde(default = "default_concurrent_fetch")]
    pub concurrent: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Clone, Deserialize)]
pub struct SourceConfig {
    /// Label used in logs and the run report
    #[serde(default)]
    pub name: Option<String>,
    pub fetch_url: String,
    /// Sniffed from the payload when omitted
    #[serde(default)]
    pub format: Option<SourceFormat>,
    /// Literal header value; prefer `auth_header_env`
    #[serde(default)]
    pub auth_header: Option<String>,
    /// Environment variable holding the header value
    #[serde(default)]
    pub auth_header_env: Option<String>,
    #[serde(default = "default_auth_header_name")]
    pub auth_header_name: String,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("name", &self.name)
            .field("fetch_url", &UrlUtils::obfuscate_credentials(&self.fetch_url))
            .field("format", &self.format)
            .field("auth_header", &self.auth_header.as_ref().map(|_| "****"))
            .field("auth_header_env", &self.auth_header_env)
            .field("auth_header_name", &self.auth_header_name)
            .finish()
    }
}

impl SourceConfig {
    pub fn new<U: Into<String>>(fetch_url: U) -> Self {
        Self {
            name: None,
            fetch_url: fetch_url.into(),
            format: None,
            auth_header: None,
            auth_header_env: None,
            auth_header_name: default_auth_header_name(),
        }
    }

    /// Configured name, or the URL with credentials masked
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UrlUtils::obfuscate_credentials(&self.fetch_url),
        }
    }

    /// Auth header for this source; an env var that is not set is an error
    pub fn auth_header(&self) -> FetchResult<Option<AuthHeader>> {
        let value = match &self.auth_header_env {
            Some(variable) => match std::env::var(variable) {
                Ok(value) if !value.is_empty() => Some(value),
                _ => {
                    return Err(FetchError::MissingSecret {
                        variable: variable.clone(),
                    });
                }
            },
            None => self.auth_header.clone().filter(|value| !value.is_empty()),
        };

        Ok(value.map(|value| AuthHeader {
            name: self.auth_header_name.clone(),
            value,
        }))
    }

    pub fn fetch_request(&self) -> FetchResult<FetchRequest> {
        Ok(FetchRequest::new(self.fetch_url.trim()).with_auth_header(self.auth_header()?))
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            normalize_to_utc: default_normalize_to_utc(),
            on_empty: OnEmpty::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            concurrent: default_concurrent_fetch(),
            user_agent: default_user_agent(),
        }
    }
}

// Default value functions for serde
fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_normalize_to_utc() -> bool {
    DEFAULT_NORMALIZE_TO_UTC
}

fn default_fetch_timeout() -> Duration {
    duration_serde::parse_default(DEFAULT_FETCH_TIMEOUT)
}

fn default_concurrent_fetch() -> bool {
    DEFAULT_CONCURRENT_FETCH
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_auth_header_name() -> String {
    DEFAULT_AUTH_HEADER_NAME.to_string()
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::configuration(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        let config = Self::from_toml(&contents)
            .map_err(|e| AppError::configuration(format!("Invalid config file {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Apply command line / environment overrides
    pub fn apply_overrides(&mut self, output: Option<PathBuf>, mapping_file: Option<PathBuf>) {
        if let Some(output) = output {
            self.output.path = output;
        }
        if let Some(mapping_file) = mapping_file {
            self.mapping_file = Some(mapping_file);
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.sources.is_empty() {
            return Err(AppError::configuration("No sources configured"));
        }

        for (i, source) in self.sources.iter().enumerate() {
            if source.fetch_url.trim().is_empty() {
                return Err(AppError::configuration(format!(
                    "Source #{} has an empty fetch_url",
                    i + 1
                )));
            }
            if source.auth_header_name.trim().is_empty() {
                return Err(AppError::configuration(format!(
                    "Source '{}' has an empty auth_header_name",
                    source.display_name()
                )));
            }
        }

        if self.fetch.timeout.is_zero() {
            return Err(AppError::configuration("fetch.timeout must be greater than zero"));
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(AppError::configuration("output.path must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
[[sources]]
fetch_url = "https://example.com/epg.xml.gz"
"#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.output.path, PathBuf::from("epg.xml"));
        assert_eq!(config.output.on_empty, OnEmpty::KeepExisting);
        assert!(!config.output.normalize_to_utc);
        assert_eq!(config.fetch.timeout, Duration::from_secs(30));
        assert!(config.fetch.concurrent);
        assert!(config.fetch.user_agent.starts_with("epg-grabber/"));
        assert!(config.mapping_file.is_none());
        assert_eq!(config.sources[0].auth_header_name, "Authorization");
        assert_eq!(config.sources[0].format, None);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
mapping_file = "channel_mappings.toml"

[output]
path = "out/guide.xml"
normalize_to_utc = true
on_empty = "write-empty"

[fetch]
timeout = "1m30s"
concurrent = false
user_agent = "custom/1.0"

[[sources]]
name = "provider-a"
fetch_url = "https://example.com/a.xml"
format = "xml"

[[sources]]
fetch_url = "guides/b.json"
format = "json"
auth_header_env = "PROVIDER_B_TOKEN"
auth_header_name = "X-Api-Key"
"#,
        )
        .unwrap();

        assert_eq!(config.output.on_empty, OnEmpty::WriteEmpty);
        assert_eq!(config.fetch.timeout, Duration::from_secs(90));
        assert!(!config.fetch.concurrent);
        assert_eq!(config.mapping_file, Some(PathBuf::from("channel_mappings.toml")));
        assert_eq!(config.sources[0].display_name(), "provider-a");
        assert_eq!(config.sources[1].format, Some(SourceFormat::Json));
        assert_eq!(config.sources[1].display_name(), "guides/b.json");
    }

    #[test]
    fn test_timeout_as_seconds() {
        let config = Config::from_toml("[fetch]\ntimeout = 5\n").unwrap();
        assert_eq!(config.fetch.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_no_sources_is_an_error() {
        let config = Config::from_toml("[output]\npath = \"epg.xml\"\n").unwrap();
        assert!(matches!(config.validate(), Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let result = Config::from_toml("[[sources]]\nfetch_url = \"x\"\nformat = \"csv\"\n");
        assert!(result.is_err());
    }

    #[rstest]
    #[case::upper("XML", SourceFormat::Xml)]
    #[case::alias("xmltv", SourceFormat::Xml)]
    #[case::mixed("Json", SourceFormat::Json)]
    fn test_format_accepts_from_str_spellings(#[case] value: &str, #[case] expected: SourceFormat) {
        let config = Config::from_toml(&format!("[[sources]]\nfetch_url = \"x\"\nformat = \"{value}\"\n")).unwrap();
        assert_eq!(config.sources[0].format, Some(expected));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from_file(dir.path().join("config.toml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_from_file_and_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[sources]]\nfetch_url = \"https://example.com/epg.xml\"").unwrap();

        let mut config = Config::load_from_file(file.path()).unwrap();
        config.apply_overrides(Some(PathBuf::from("/tmp/out.xml")), Some(PathBuf::from("maps.toml")));
        assert_eq!(config.output.path, PathBuf::from("/tmp/out.xml"));
        assert_eq!(config.mapping_file, Some(PathBuf::from("maps.toml")));
    }

    #[test]
    fn test_display_name_masks_credentials() {
        let source = SourceConfig::new("http://example.com/xmltv.php?username=bob&password=secret");
        assert_eq!(
            source.display_name(),
            "http://example.com/xmltv.php?username=****&password=****"
        );
    }

    #[test]
    fn test_literal_auth_header_is_masked_in_debug() {
        let mut source = SourceConfig::new("https://example.com/epg.xml");
        source.auth_header = Some("Bearer very-secret".to_string());

        let header = source.auth_header().unwrap().unwrap();
        assert_eq!(header.name, "Authorization");
        assert_eq!(header.value, "Bearer very-secret");
        assert!(!format!("{source:?}").contains("very-secret"));
    }

    #[test]
    fn test_missing_auth_env_is_a_fetch_error() {
        let mut source = SourceConfig::new("https://example.com/epg.xml");
        source.auth_header_env = Some("EPG_GRABBER_TEST_UNSET_VARIABLE".to_string());
        assert!(matches!(
            source.auth_header(),
            Err(FetchError::MissingSecret { variable }) if variable == "EPG_GRABBER_TEST_UNSET_VARIABLE"
        ));
    }
}
