//! Persisted marketplace entities owned by the ingestion flows.

use crate::audio::AudioFormat;
use serde::{Deserialize, Serialize};

/// A stored audio binary. Immutable once created; metadata may be attached
/// later by the lazy extraction flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAsset {
    pub id: String,
    pub original_filename: String,
    pub file_size_bytes: u64,
    pub format: AudioFormat,
    /// Location of the bytes under the media directory.
    pub storage_path: String,
    /// Epoch millis.
    pub created_at: i64,
}

impl AudioAsset {
    pub fn new(
        id: impl Into<String>,
        original_filename: impl Into<String>,
        file_size_bytes: u64,
        format: AudioFormat,
        storage_path: impl Into<String>,
    ) -> Self {
        AudioAsset {
            id: id.into(),
            original_filename: original_filename.into(),
            file_size_bytes,
            format,
            storage_path: storage_path.into(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// A product listing. A product without an audio asset is representable
/// (`audio_asset_id: None`); the metadata endpoint reports not-found for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub seller_id: String,
    pub audio_asset_id: Option<String>,
    pub is_active: bool,
    /// Epoch millis.
    pub created_at: i64,
}

impl Product {
    pub fn new(
        id: impl Into<String>,
        draft: ProductDraft,
        seller_id: impl Into<String>,
        audio_asset_id: Option<String>,
    ) -> Self {
        Product {
            id: id.into(),
            title: draft.title,
            description: draft.description,
            price_cents: draft.price_cents,
            seller_id: seller_id.into(),
            audio_asset_id,
            is_active: true,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Listing fields supplied by the client at upload time.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
}
