/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Output defaults
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_OUTPUT_PATH: &str = "epg.xml";
pub const DEFAULT_NORMALIZE_TO_UTC: bool = false;

// Fetch defaults
pub const DEFAULT_FETCH_TIMEOUT: &str = "30s";
pub const DEFAULT_CONCURRENT_FETCH: bool = true;
pub const DEFAULT_USER_AGENT: &str = concat!("epg-grabber/", env!("CARGO_PKG_VERSION"));

// Source defaults
pub const DEFAULT_AUTH_HEADER_NAME: &str = "Authorization";
