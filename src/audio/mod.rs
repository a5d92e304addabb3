//! Audio file acceptance and metadata extraction.
//!
//! Ordered pipeline:
//! 1. [`AudioFormat::classify`] sniffs the format from the filename.
//! 2. [`validate_upload`] enforces the acceptance policy (format + size).
//! 3. [`MetadataExtractor`] derives stream metadata, degrading to fallback
//!    values instead of failing on malformed containers.

mod extractor;
mod format;
mod metadata;
mod validation;

pub use extractor::{MetadataExtractor, StreamInfoExtractor};
pub use format::AudioFormat;
pub use metadata::{AudioMetadata, DEFAULT_SAMPLE_RATE_HZ};
pub use validation::{validate_upload, ValidationError, MAX_UPLOAD_SIZE_BYTES};
