//! Ingestion orchestration.
//!
//! Two flows tie validation, extraction, and persistence together:
//!
//! - **Eager** ([`IngestionManager::create_product_with_upload`]): runs at
//!   upload time. Validation failures abort before any I/O; extraction
//!   failures do not abort anything; the asset, its metadata, and the owning
//!   product are committed in one transaction.
//! - **Lazy** ([`IngestionManager::product_audio_metadata`]): cache-or-compute
//!   against an already-stored product. Existing metadata is returned
//!   unchanged; otherwise extraction runs against the stored asset file and
//!   the result is attached with get-or-create semantics.

use super::file_store::MediaStore;
use super::models::{AudioAsset, Product, ProductDraft};
use super::store::MarketStore;
use crate::audio::{validate_upload, AudioMetadata, MetadataExtractor, ValidationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors surfaced by the ingestion flows.
///
/// Degraded extraction is deliberately absent: a malformed-but-accepted file
/// produces fallback metadata, never an error.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Upload rejected by the acceptance policy. The message is shown to
    /// the client verbatim.
    #[error("{0}")]
    Rejected(#[from] ValidationError),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The product exists but has no audio asset to extract from.
    #[error("Product {0} has no audio asset")]
    AssetNotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Orchestrates upload validation, metadata extraction, media storage, and
/// record persistence. The acting principal is always passed in explicitly.
pub struct IngestionManager {
    store: Arc<dyn MarketStore>,
    media: Arc<MediaStore>,
    extractor: Arc<dyn MetadataExtractor>,
}

impl IngestionManager {
    pub fn new(
        store: Arc<dyn MarketStore>,
        media: Arc<MediaStore>,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Self {
        Self {
            store,
            media,
            extractor,
        }
    }

    /// Eager flow: validate the upload, extract metadata, persist the bytes,
    /// and create asset + metadata + product in a single transaction.
    ///
    /// On rejection nothing is created. On transaction failure the stored
    /// media file is removed so no orphaned bytes remain.
    pub async fn create_product_with_upload(
        &self,
        seller_id: &str,
        draft: ProductDraft,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<(Product, AudioMetadata), IngestionError> {
        // Gate before any temp file or extraction work.
        let format = validate_upload(filename, data.len() as u64)?;

        let extractor = self.extractor.clone();
        let original_filename = filename.to_string();
        let (metadata, data) = tokio::task::spawn_blocking(move || {
            let metadata = extractor.extract_upload(&original_filename, format, &data);
            (metadata, data)
        })
        .await
        .map_err(|e| anyhow::anyhow!("extraction task failed: {}", e))?;

        let asset_id = uuid::Uuid::new_v4().to_string();
        let storage_path = self
            .media
            .save_asset(&asset_id, format, &data)
            .await?
            .to_string_lossy()
            .into_owned();

        let asset = AudioAsset::new(
            asset_id.as_str(),
            filename,
            data.len() as u64,
            format,
            storage_path.as_str(),
        );
        let product = Product::new(
            uuid::Uuid::new_v4().to_string(),
            draft,
            seller_id,
            Some(asset_id.clone()),
        );

        if let Err(e) = self
            .store
            .create_product_with_audio(&product, &asset, &metadata)
        {
            warn!("Failed to persist product for upload {}: {}", filename, e);
            if let Err(cleanup_err) = self.media.delete_asset(&storage_path).await {
                warn!(
                    "Failed to remove asset file after rollback: {}",
                    cleanup_err
                );
            }
            return Err(IngestionError::Internal(e));
        }

        info!(
            "Created product {} with asset {} ({}, {} bytes)",
            product.id,
            asset_id,
            format.as_str(),
            asset.file_size_bytes
        );

        Ok((product, metadata))
    }

    /// Lazy flow: return the stored metadata for a product's audio asset,
    /// extracting and persisting it on first request.
    pub async fn product_audio_metadata(
        &self,
        product_id: &str,
    ) -> Result<AudioMetadata, IngestionError> {
        let product = self
            .store
            .get_product(product_id)?
            .ok_or_else(|| IngestionError::ProductNotFound(product_id.to_string()))?;

        let asset_id = product
            .audio_asset_id
            .ok_or_else(|| IngestionError::AssetNotFound(product_id.to_string()))?;

        // A dangling asset reference is reported the same as no asset.
        let asset = self
            .store
            .get_asset(&asset_id)?
            .ok_or_else(|| IngestionError::AssetNotFound(product_id.to_string()))?;

        if let Some(existing) = self.store.get_metadata(&asset_id)? {
            return Ok(existing);
        }

        debug!("No metadata for asset {}, extracting lazily", asset_id);

        let path = self.media.absolute_path(&asset.storage_path);
        let extractor = self.extractor.clone();
        let format = asset.format;
        let file_size_bytes = asset.file_size_bytes;
        let metadata = tokio::task::spawn_blocking(move || {
            extractor.extract_stored(&path, format, file_size_bytes)
        })
        .await
        .map_err(|e| anyhow::anyhow!("extraction task failed: {}", e))?;

        // A concurrent request may have attached metadata in the meantime;
        // whichever row won is returned.
        let stored = self.store.insert_metadata_if_absent(&asset_id, &metadata)?;
        Ok(stored)
    }

    /// Point lookup used by the product route.
    pub fn get_product(&self, id: &str) -> Result<Option<Product>, IngestionError> {
        Ok(self.store.get_product(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, StreamInfoExtractor, DEFAULT_SAMPLE_RATE_HZ};
    use crate::ingestion::store::SqliteMarketStore;
    use anyhow::Result;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_wav(frames: u32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..frames {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    fn draft() -> ProductDraft {
        ProductDraft {
            title: "Rain loop".to_string(),
            description: "Field recording".to_string(),
            price_cents: 499,
        }
    }

    struct TestHarness {
        manager: IngestionManager,
        store: Arc<SqliteMarketStore>,
        media: Arc<MediaStore>,
        _media_dir: tempfile::TempDir,
        _staging_dir: tempfile::TempDir,
    }

    async fn harness() -> TestHarness {
        let store = Arc::new(SqliteMarketStore::in_memory().unwrap());
        let media_dir = tempfile::tempdir().unwrap();
        let staging_dir = tempfile::tempdir().unwrap();

        let media = Arc::new(MediaStore::new(media_dir.path()));
        media.init().await.unwrap();
        let extractor = StreamInfoExtractor::new(staging_dir.path());
        extractor.init().unwrap();

        let manager =
            IngestionManager::new(store.clone(), media.clone(), Arc::new(extractor));
        TestHarness {
            manager,
            store,
            media,
            _media_dir: media_dir,
            _staging_dir: staging_dir,
        }
    }

    /// Extractor double that counts invocations and returns a canned record.
    struct CountingExtractor {
        calls: AtomicUsize,
        canned: AudioMetadata,
    }

    impl CountingExtractor {
        fn new(canned: AudioMetadata) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                canned,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MetadataExtractor for CountingExtractor {
        fn extract_upload(&self, _: &str, _: AudioFormat, _: &[u8]) -> AudioMetadata {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.canned.clone()
        }

        fn extract_stored(&self, _: &Path, _: AudioFormat, _: u64) -> AudioMetadata {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.canned.clone()
        }
    }

    #[tokio::test]
    async fn test_eager_creates_product_asset_and_metadata() {
        let h = harness().await;
        let data = make_wav(44_100, 44_100);

        let (product, metadata) = h
            .manager
            .create_product_with_upload("seller1", draft(), "loop.wav", data.clone())
            .await
            .unwrap();

        assert!((metadata.duration_secs - 1.0).abs() < 1e-9);
        assert_eq!(metadata.sample_rate, 44_100);
        assert_eq!(metadata.file_format, "wav");
        assert_eq!(metadata.file_size_bytes, data.len() as u64);

        // All three records are in the store.
        let stored_product = h.store.get_product(&product.id).unwrap().unwrap();
        let asset_id = stored_product.audio_asset_id.unwrap();
        let asset = h.store.get_asset(&asset_id).unwrap().unwrap();
        assert_eq!(asset.original_filename, "loop.wav");
        assert_eq!(asset.format, AudioFormat::Wav);
        assert_eq!(h.store.get_metadata(&asset_id).unwrap().unwrap(), metadata);

        // The bytes landed under the media directory.
        let absolute = h.media.absolute_path(&asset.storage_path);
        assert_eq!(std::fs::read(absolute).unwrap(), data);
    }

    #[tokio::test]
    async fn test_eager_rejects_unsupported_extension_before_extraction() {
        let store = Arc::new(SqliteMarketStore::in_memory().unwrap());
        let media_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(MediaStore::new(media_dir.path()));
        media.init().await.unwrap();
        let extractor = Arc::new(CountingExtractor::new(AudioMetadata::fallback(
            AudioFormat::Mp3,
            0,
        )));

        let manager = IngestionManager::new(store, media, extractor.clone());
        let err = manager
            .create_product_with_upload("seller1", draft(), "notes.txt", b"text".to_vec())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestionError::Rejected(ValidationError::UnsupportedExtension)
        ));
        // Rejected input never reaches the extractor.
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_eager_rejects_oversized_upload() {
        let h = harness().await;
        let data = vec![0u8; (crate::audio::MAX_UPLOAD_SIZE_BYTES + 1) as usize];

        let err = h
            .manager
            .create_product_with_upload("seller1", draft(), "big.mp3", data)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestionError::Rejected(ValidationError::FileTooLarge)
        ));
    }

    #[tokio::test]
    async fn test_eager_corrupt_file_still_creates_with_fallback_metadata() {
        let h = harness().await;

        let (product, metadata) = h
            .manager
            .create_product_with_upload(
                "seller1",
                draft(),
                "broken.mp3",
                b"not an mpeg frame".to_vec(),
            )
            .await
            .unwrap();

        assert_eq!(metadata.duration_secs, 0.0);
        assert_eq!(metadata.sample_rate, DEFAULT_SAMPLE_RATE_HZ);
        assert_eq!(metadata.file_format, "mp3");
        assert!(h.store.get_product(&product.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_eager_persistence_failure_removes_media_file() {
        let store = Arc::new(RefusingStore);
        let media_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(MediaStore::new(media_dir.path()));
        media.init().await.unwrap();
        let extractor = Arc::new(CountingExtractor::new(AudioMetadata::fallback(
            AudioFormat::Wav,
            4,
        )));

        let manager = IngestionManager::new(store, media, extractor);
        let err = manager
            .create_product_with_upload("seller1", draft(), "loop.wav", b"data".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::Internal(_)));

        // No asset bytes are left behind after the rollback.
        assert_eq!(count_files(media_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_lazy_missing_product_is_not_found() {
        let h = harness().await;
        let err = h
            .manager
            .product_audio_metadata("nope")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_lazy_product_without_asset_is_not_found() {
        let h = harness().await;
        let product = Product::new("p1", draft(), "seller1", None);
        h.store.create_product(&product).unwrap();

        let err = h.manager.product_audio_metadata("p1").await.unwrap_err();
        assert!(matches!(err, IngestionError::AssetNotFound(_)));
    }

    #[tokio::test]
    async fn test_lazy_extracts_once_then_serves_stored_row() {
        let store = Arc::new(SqliteMarketStore::in_memory().unwrap());
        let media_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(MediaStore::new(media_dir.path()));
        media.init().await.unwrap();

        let canned = AudioMetadata {
            duration_secs: 2.5,
            sample_rate: 48_000,
            bit_rate_kbps: Some(320),
            channels: Some(2),
            file_format: "flac".to_string(),
            file_size_bytes: 4096,
        };
        let extractor = Arc::new(CountingExtractor::new(canned.clone()));
        let manager = IngestionManager::new(store.clone(), media.clone(), extractor.clone());

        // Seed an asset and product without metadata, as an import outside
        // the upload flow would leave them.
        let relative = media
            .save_asset("asset1", AudioFormat::Flac, b"flac")
            .await
            .unwrap();
        let asset = AudioAsset::new(
            "asset1",
            "song.flac",
            4096,
            AudioFormat::Flac,
            relative.to_str().unwrap(),
        );
        store.create_asset(&asset).unwrap();
        let product = Product::new("p1", draft(), "seller1", Some("asset1".to_string()));
        store.create_product(&product).unwrap();

        let first = manager.product_audio_metadata("p1").await.unwrap();
        assert_eq!(first, canned);
        assert_eq!(extractor.calls(), 1);

        // Second request serves the stored row without re-extraction.
        let second = manager.product_audio_metadata("p1").await.unwrap();
        assert_eq!(second, canned);
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test]
    async fn test_lazy_extraction_against_stored_wav() {
        let h = harness().await;
        let data = make_wav(22_050, 44_100);

        let relative = h
            .media
            .save_asset("asset1", AudioFormat::Wav, &data)
            .await
            .unwrap();
        let asset = AudioAsset::new(
            "asset1",
            "half.wav",
            data.len() as u64,
            AudioFormat::Wav,
            relative.to_str().unwrap(),
        );
        h.store.create_asset(&asset).unwrap();
        let product = Product::new("p1", draft(), "seller1", Some("asset1".to_string()));
        h.store.create_product(&product).unwrap();

        let metadata = h.manager.product_audio_metadata("p1").await.unwrap();
        assert!((metadata.duration_secs - 0.5).abs() < 1e-9);
        assert_eq!(metadata.sample_rate, 44_100);

        // The row is now persisted.
        assert!(h.store.get_metadata("asset1").unwrap().is_some());
    }

    /// Store that refuses the transactional create, for rollback tests.
    struct RefusingStore;

    impl MarketStore for RefusingStore {
        fn create_product_with_audio(
            &self,
            _: &Product,
            _: &AudioAsset,
            _: &AudioMetadata,
        ) -> Result<()> {
            anyhow::bail!("database unavailable")
        }

        fn create_product(&self, _: &Product) -> Result<()> {
            anyhow::bail!("database unavailable")
        }

        fn create_asset(&self, _: &AudioAsset) -> Result<()> {
            anyhow::bail!("database unavailable")
        }

        fn get_product(&self, _: &str) -> Result<Option<Product>> {
            Ok(None)
        }

        fn get_asset(&self, _: &str) -> Result<Option<AudioAsset>> {
            Ok(None)
        }

        fn get_metadata(&self, _: &str) -> Result<Option<AudioMetadata>> {
            Ok(None)
        }

        fn insert_metadata_if_absent(
            &self,
            _: &str,
            _: &AudioMetadata,
        ) -> Result<AudioMetadata> {
            anyhow::bail!("database unavailable")
        }
    }

    fn count_files(dir: &Path) -> usize {
        let mut count = 0;
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            for entry in std::fs::read_dir(&current).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    count += 1;
                }
            }
        }
        count
    }
}
