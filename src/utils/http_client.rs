use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use tracing::debug;

use crate::errors::{FetchError, FetchResult};
use crate::utils::decompression::DecompressionService;
use crate::utils::url::{SourceLocation, UrlUtils};

/// Extra request header carrying a secret; the value never appears in `Debug`
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"****")
            .finish()
    }
}

/// One source retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub auth_header: Option<AuthHeader>,
}

impl FetchRequest {
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            auth_header: None,
        }
    }

    pub fn with_auth_header(mut self, header: Option<AuthHeader>) -> Self {
        self.auth_header = header;
        self
    }
}

/// Retrieves the raw, decompressed bytes of a source
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<Bytes>;
}

/// Fetcher backed by reqwest for `http(s)` URLs and the filesystem for
/// `file://` URLs and plain paths. Compressed payloads are inflated.
pub struct StandardHttpClient {
    client: Client,
    timeout: Duration,
}

impl StandardHttpClient {
    /// Create a client with a total request timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::transport("http_client", e.to_string()))?;

        Ok(Self { client, timeout })
    }

    async fn fetch_remote(&self, url: &reqwest::Url, request: &FetchRequest) -> FetchResult<Bytes> {
        let masked = UrlUtils::obfuscate_credentials(url.as_str());
        debug!("Fetching {}", masked);

        let mut builder = self.client.get(url.clone());
        if let Some(header) = &request.auth_header {
            builder = builder.header(header.name.as_str(), header.value.as_str());
        }

        let response = builder.send().await.map_err(|e| self.map_reqwest_error(e, &masked))?;
        self.process_response_to_bytes(response, &masked).await
    }

    /// Check status and collect the body
    async fn process_response_to_bytes(&self, response: Response, masked_url: &str) -> FetchResult<Bytes> {
        if !response.status().is_success() {
            return Err(FetchError::Http {
                status: response.status().as_u16(),
                url: masked_url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_reqwest_error(e, masked_url))?;

        debug!("Fetched {} bytes of raw content from {}", bytes.len(), masked_url);
        Ok(bytes)
    }

    fn map_reqwest_error(&self, error: reqwest::Error, masked_url: &str) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: masked_url.to_string(),
                timeout: self.timeout,
            }
        } else {
            // reqwest includes the full URL in its message
            let message = UrlUtils::obfuscate_credentials(&error.without_url().to_string());
            FetchError::transport(masked_url, message)
        }
    }
}

async fn read_local(path: &Path) -> FetchResult<Bytes> {
    debug!("Reading local source {}", path.display());
    let data = tokio::fs::read(path).await.map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Bytes::from(data))
}

#[async_trait]
impl SourceFetcher for StandardHttpClient {
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<Bytes> {
        let raw = match UrlUtils::resolve(&request.url)? {
            SourceLocation::Remote(url) => self.fetch_remote(&url, request).await?,
            SourceLocation::Local(path) => read_local(&path).await?,
        };
        DecompressionService::decompress(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn client() -> StandardHttpClient {
        StandardHttpClient::new(Duration::from_secs(5), "epg-grabber-test").unwrap()
    }

    #[test]
    fn test_auth_header_debug_is_masked() {
        let request = FetchRequest::new("https://example.com/epg.xml").with_auth_header(Some(AuthHeader {
            name: "Authorization".to_string(),
            value: "Bearer secret-token".to_string(),
        }));
        let debug = format!("{request:?}");
        assert!(debug.contains("Authorization"));
        assert!(!debug.contains("secret-token"));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"<tv></tv>").unwrap();

        let bytes = client()
            .fetch(&FetchRequest::new(file.path().to_string_lossy()))
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"<tv></tv>");
    }

    #[cfg(feature = "compression-gzip")]
    #[tokio::test]
    async fn test_fetch_local_gzip_is_decompressed() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"{\"channels\":[]}").unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&encoder.finish().unwrap()).unwrap();

        let bytes = client()
            .fetch(&FetchRequest::new(file.path().to_string_lossy()))
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), b"{\"channels\":[]}");
    }

    #[tokio::test]
    async fn test_fetch_missing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.xml");
        let err = client()
            .fetch(&FetchRequest::new(missing.to_string_lossy()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn test_fetch_rejects_unsupported_scheme() {
        let err = client()
            .fetch(&FetchRequest::new("ftp://example.com/epg.xml"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
