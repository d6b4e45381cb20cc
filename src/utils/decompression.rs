//! Magic-byte detection and decompression of fetched guide payloads

use bytes::Bytes;
#[cfg(any(
    feature = "compression-gzip",
    feature = "compression-bzip2",
    feature = "compression-xz"
))]
use std::io::Read;
use tracing::debug;

use crate::errors::{FetchError, FetchResult};

/// Supported compression formats detected by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    Gzip,
    Bzip2,
    Xz,
    Uncompressed,
}

impl CompressionFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Uncompressed => "uncompressed",
        }
    }
}

/// Magic file detection and decompression utility
pub struct DecompressionService;

impl DecompressionService {
    /// Detect compression format using magic bytes
    pub fn detect_compression_format(data: &[u8]) -> CompressionFormat {
        match infer::get(data).map(|kind| kind.mime_type()) {
            Some("application/gzip") => CompressionFormat::Gzip,
            Some("application/x-bzip2") => CompressionFormat::Bzip2,
            Some("application/x-xz") => CompressionFormat::Xz,
            _ => CompressionFormat::Uncompressed,
        }
    }

    /// Decompress data based on detected format; uncompressed data passes through
    pub fn decompress(data: Bytes) -> FetchResult<Bytes> {
        let format = Self::detect_compression_format(&data);
        debug!("Detected compression format: {:?}", format);

        match format {
            CompressionFormat::Gzip => Self::decompress_gzip(data),
            CompressionFormat::Bzip2 => Self::decompress_bzip2(data),
            CompressionFormat::Xz => Self::decompress_xz(data),
            CompressionFormat::Uncompressed => Ok(data),
        }
    }

    #[cfg(feature = "compression-gzip")]
    fn decompress_gzip(data: Bytes) -> FetchResult<Bytes> {
        let decoder = flate2::read::GzDecoder::new(data.as_ref());
        Self::read_all(decoder, CompressionFormat::Gzip)
    }

    #[cfg(not(feature = "compression-gzip"))]
    fn decompress_gzip(_data: Bytes) -> FetchResult<Bytes> {
        Err(Self::unsupported(CompressionFormat::Gzip, "compression-gzip"))
    }

    #[cfg(feature = "compression-bzip2")]
    fn decompress_bzip2(data: Bytes) -> FetchResult<Bytes> {
        let decoder = bzip2::read::BzDecoder::new(data.as_ref());
        Self::read_all(decoder, CompressionFormat::Bzip2)
    }

    #[cfg(not(feature = "compression-bzip2"))]
    fn decompress_bzip2(_data: Bytes) -> FetchResult<Bytes> {
        Err(Self::unsupported(CompressionFormat::Bzip2, "compression-bzip2"))
    }

    #[cfg(feature = "compression-xz")]
    fn decompress_xz(data: Bytes) -> FetchResult<Bytes> {
        let decoder = xz2::read::XzDecoder::new(data.as_ref());
        Self::read_all(decoder, CompressionFormat::Xz)
    }

    #[cfg(not(feature = "compression-xz"))]
    fn decompress_xz(_data: Bytes) -> FetchResult<Bytes> {
        Err(Self::unsupported(CompressionFormat::Xz, "compression-xz"))
    }

    #[cfg(any(
        feature = "compression-gzip",
        feature = "compression-bzip2",
        feature = "compression-xz"
    ))]
    fn read_all<R: Read>(mut decoder: R, format: CompressionFormat) -> FetchResult<Bytes> {
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| FetchError::decompression(format.as_str(), e.to_string()))?;
        debug!(
            "Decompressed {} content to {} bytes",
            format.as_str(),
            decompressed.len()
        );
        Ok(Bytes::from(decompressed))
    }

    #[allow(dead_code)]
    fn unsupported(format: CompressionFormat, feature: &str) -> FetchError {
        FetchError::decompression(
            format.as_str(),
            format!("support not compiled in (enable the '{feature}' feature)"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_detect_uncompressed() {
        let data = b"<tv></tv>";
        let format = DecompressionService::detect_compression_format(data);
        assert_eq!(format, CompressionFormat::Uncompressed);
    }

    #[test]
    fn test_decompress_uncompressed_passes_through() {
        let data = Bytes::from_static(b"{\"channels\":[]}");
        let result = DecompressionService::decompress(data.clone()).unwrap();
        assert_eq!(result, data);
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn test_detect_and_decompress_gzip() {
        let original_data = b"<tv><channel id=\"ch1\"/></tv>";

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original_data).unwrap();
        let compressed = encoder.finish().unwrap();

        let format = DecompressionService::detect_compression_format(&compressed);
        assert_eq!(format, CompressionFormat::Gzip);

        let decompressed = DecompressionService::decompress(Bytes::from(compressed)).unwrap();
        assert_eq!(decompressed.as_ref(), original_data);
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn test_truncated_gzip_is_an_error() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[b'x'; 4096]).unwrap();
        let mut compressed = encoder.finish().unwrap();
        compressed.truncate(compressed.len() / 2);

        let err = DecompressionService::decompress(Bytes::from(compressed)).unwrap_err();
        assert!(matches!(err, FetchError::Decompression { .. }));
    }
}
