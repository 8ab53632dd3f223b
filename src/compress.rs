//! Compression collaborator (component H).
//!
//! `GzipCompressor` is the crate's default concrete `Compressor`, built on
//! `async-compression`'s Tokio gzip adapters the same way `gazette::journal`
//! decompresses fragment bodies inline rather than pushing the codec
//! entirely onto callers.

use async_compression::tokio::bufread::{GzipDecoder, GzipEncoder};
use async_trait::async_trait;
use tokio::io::AsyncReadExt;

#[async_trait]
pub trait Compressor: Send + Sync {
    async fn compress(&self, bytes: Vec<u8>) -> crate::Result<Vec<u8>>;
    async fn decompress(&self, bytes: Vec<u8>) -> crate::Result<Vec<u8>>;
}

/// Gzip via `async-compression`. Zero-sized; safe to construct per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipCompressor;

#[async_trait]
impl Compressor for GzipCompressor {
    async fn compress(&self, bytes: Vec<u8>) -> crate::Result<Vec<u8>> {
        let mut encoder = GzipEncoder::new(bytes.as_slice());
        let mut out = Vec::new();
        encoder
            .read_to_end(&mut out)
            .await
            .map_err(|err| crate::Error::Codec(err.to_string()))?;
        Ok(out)
    }

    async fn decompress(&self, bytes: Vec<u8>) -> crate::Result<Vec<u8>> {
        let mut decoder = GzipDecoder::new(bytes.as_slice());
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .await
            .map_err(|err| crate::Error::Codec(err.to_string()))?;
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn round_trips_through_gzip() {
        let compressor = GzipCompressor;
        let original = b"the quick brown fox jumps over the lazy dog".to_vec();
        let compressed = compressor.compress(original.clone()).await.unwrap();
        assert_ne!(compressed, original);
        let decompressed = compressor.decompress(compressed).await.unwrap();
        assert_eq!(decompressed, original);
    }

    #[tokio::test]
    async fn round_trips_empty_input() {
        let compressor = GzipCompressor;
        let compressed = compressor.compress(Vec::new()).await.unwrap();
        let decompressed = compressor.decompress(compressed).await.unwrap();
        assert!(decompressed.is_empty());
    }
}
