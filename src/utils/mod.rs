//! Utility modules for common functionality

pub mod decompression;
pub mod http_client;
pub mod time;
pub mod url;

pub use decompression::{CompressionFormat, DecompressionService};
pub use http_client::{AuthHeader, FetchRequest, SourceFetcher, StandardHttpClient};
pub use url::UrlUtils;
