//! Audiomart Server Library
//!
//! Marketplace backend for buying and selling audio files. The core is the
//! ingestion subsystem: upload validation, audio metadata extraction, and
//! the orchestration that persists products with their audio assets.

pub mod audio;
pub mod ingestion;
pub mod server;

// Re-export commonly used types for convenience
pub use audio::{
    validate_upload, AudioFormat, AudioMetadata, MetadataExtractor, StreamInfoExtractor,
    ValidationError, MAX_UPLOAD_SIZE_BYTES,
};
pub use ingestion::{
    IngestionError, IngestionManager, MarketStore, MediaStore, SqliteMarketStore,
};
pub use server::run_server;
