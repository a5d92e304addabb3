//! Audio format sniffing.
//!
//! Classification is purely name-based: the extension is matched against the
//! supported set without ever opening the file. Content-level surprises are
//! handled later by the metadata extractor, which degrades gracefully.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Audio container formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
}

impl AudioFormat {
    /// Classify a filename by its extension (case-insensitive).
    ///
    /// Returns `None` for missing or unsupported extensions. Never touches
    /// the filesystem.
    pub fn classify(filename: &str) -> Option<AudioFormat> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())?;
        AudioFormat::parse(&ext)
    }

    /// The lowercase extension without the leading dot.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Flac => "flac",
        }
    }

    pub fn parse(s: &str) -> Option<AudioFormat> {
        match s {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            _ => None,
        }
    }
}
