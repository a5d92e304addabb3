//! Upload acceptance policy.
//!
//! The validator gates every upload before any temp file is materialized or
//! any extraction work runs. Both limits are part of the observable API
//! contract: the supported set is exactly {mp3, wav, flac} and the size
//! ceiling is exactly 50 MiB.

use super::format::AudioFormat;
use thiserror::Error;

/// Maximum accepted upload size: 50 MiB.
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 50 * 1024 * 1024;

/// Reasons an upload is rejected. Messages are surfaced to clients verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unsupported file extension. Supported extensions are: mp3, wav, flac")]
    UnsupportedExtension,

    #[error("File size exceeds 50MB limit")]
    FileTooLarge,
}

/// Validate an upload by name and declared size, short-circuiting on the
/// first failed rule: extension first, then size. Returns the classified
/// format so callers never re-sniff.
pub fn validate_upload(filename: &str, size_bytes: u64) -> Result<AudioFormat, ValidationError> {
    let format =
        AudioFormat::classify(filename).ok_or(ValidationError::UnsupportedExtension)?;

    if size_bytes > MAX_UPLOAD_SIZE_BYTES {
        return Err(ValidationError::FileTooLarge);
    }

    Ok(format)
}
