//! Structural audio metadata.

use super::format::AudioFormat;
use serde::{Deserialize, Serialize};

/// Nominal sample rate assumed when a stream does not report one.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

/// Stream-level facts derived from an audio container without decoding any
/// sample data.
///
/// `file_format` and `file_size_bytes` are always populated since they are
/// derivable from the upload alone. The remaining fields hold fallback
/// values when extraction is degraded: duration 0.0, sample rate 44100,
/// bit rate and channels absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    /// Duration in seconds, 0.0 when unknown.
    pub duration_secs: f64,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit rate in kbps, when the container reports one.
    pub bit_rate_kbps: Option<u32>,
    /// Channel count, when the container reports one.
    pub channels: Option<u16>,
    /// Lowercase extension without the dot, e.g. "wav".
    pub file_format: String,
    /// Size of the original upload in bytes.
    pub file_size_bytes: u64,
}

impl AudioMetadata {
    /// The degraded record used when stream parsing fails: only the fields
    /// derivable without touching the container contents are meaningful.
    pub fn fallback(format: AudioFormat, file_size_bytes: u64) -> Self {
        AudioMetadata {
            duration_secs: 0.0,
            sample_rate: DEFAULT_SAMPLE_RATE_HZ,
            bit_rate_kbps: None,
            channels: None,
            file_format: format.as_str().to_string(),
            file_size_bytes,
        }
    }
}
